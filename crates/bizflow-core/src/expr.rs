//! Sandboxed expression language used by CODE and IF_CONDITION nodes.
//!
//! Programs are a list of statements separated by `;` or newlines:
//!
//! ```text
//! let total = {{n1.output.count}} * 2
//! log("total is " + total)
//! return { doubled: total, big: total > 10 }
//! ```
//!
//! There are no loops, no user functions and no access to the host, so every
//! program terminates. Statement count, expression height and the size of
//! every value built by a program are bounded.
//! Identifiers resolve against local `let` bindings first, then against the
//! execution context by node id. `context` names the whole context.

use std::collections::HashMap;

use serde_json::{Map, Number, Value};
use thiserror::Error;

use crate::runtime::{
    ExecutionContext, compare_numbers, display_value, format_number, step_into, string_contains,
    value_as_f64, values_equal,
};

/// Counts parenthesised nesting as well as the length of operator and
/// member chains, so it bounds the height of the syntax tree.
const MAX_DEPTH: usize = 128;
const MAX_STATEMENTS: usize = 256;
/// Budget for a single value: string bytes plus one per array element,
/// object entry and scalar.
const MAX_VALUE_SIZE: usize = 100_000;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    #[error("Unexpected character '{0}'")]
    UnexpectedChar(char),
    #[error("Unterminated string literal")]
    UnterminatedString,
    #[error("Unterminated placeholder")]
    UnterminatedPlaceholder,
    #[error("Unexpected token {found}, expected {expected}")]
    UnexpectedToken { found: String, expected: String },
    #[error("Unexpected end of input")]
    UnexpectedEnd,
    #[error("{0} is not defined")]
    Undefined(String),
    #[error("Unknown function {0}")]
    UnknownFunction(String),
    #[error("{name} expects {expected} argument(s), got {got}")]
    Arity {
        name: String,
        expected: usize,
        got: usize,
    },
    #[error("Cannot apply '{op}' to {left} and {right}")]
    TypeMismatch {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },
    #[error("Cannot read property '{property}' of null")]
    NullAccess { property: String },
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Cannot convert '{0}' to a number")]
    NotANumber(String),
    #[error("Expression is nested too deeply")]
    TooDeep,
    #[error("Program has more than {MAX_STATEMENTS} statements")]
    TooManyStatements,
    #[error("Value exceeds the size limit of {MAX_VALUE_SIZE}")]
    TooLarge,
}

/// Result of running a program: the `return` value (null when the program
/// never returns) plus everything passed to `log()`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramOutput {
    pub value: Value,
    pub logs: Vec<String>,
}

/// Parse and run `source` against `context`.
pub fn run_program(source: &str, context: &ExecutionContext) -> Result<ProgramOutput, ExprError> {
    let program = Parser::new(tokenize(source)?).program()?;
    let mut interp = Interpreter::new(context);
    let value = interp.run(&program)?;
    Ok(ProgramOutput {
        value,
        logs: interp.logs,
    })
}

/// Evaluate a single condition expression to a boolean using truthiness.
pub fn evaluate_condition(source: &str, context: &ExecutionContext) -> Result<bool, ExprError> {
    let mut parser = Parser::new(tokenize(source)?);
    let expr = parser.expression()?;
    parser.skip_separators();
    parser.expect_end()?;
    let mut interp = Interpreter::new(context);
    Ok(truthy(&interp.eval(&expr)?))
}

// ---------------------------------------------------------------------------
// Lexer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Str(String),
    Ident(String),
    /// `{{path}}` left in the source; resolved against the context.
    Placeholder(String),
    Op(&'static str),
    Separator,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Number(n) => format_number(*n),
            Token::Str(s) => format!("\"{s}\""),
            Token::Ident(name) => name.clone(),
            Token::Placeholder(path) => format!("{{{{{path}}}}}"),
            Token::Op(op) => format!("'{op}'"),
            Token::Separator => "end of statement".to_string(),
        }
    }
}

/// Longest operators first so `===` is not read as `==` then `=`.
const OPERATORS: [&str; 26] = [
    "===", "!==", "==", "!=", "<=", ">=", "&&", "||", "(", ")", "{", "}", "[", "]", ",", ":", ".",
    "+", "-", "*", "/", "%", "!", "<", ">", "=",
];

fn tokenize(source: &str) -> Result<Vec<Token>, ExprError> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    // Newlines only separate statements outside brackets.
    let mut nesting = 0usize;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '\n' || c == ';' {
            if c == ';' || nesting == 0 {
                tokens.push(Token::Separator);
            }
            i += 1;
            continue;
        }
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        if c == '/' && chars.get(i + 1) == Some(&'/') {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
            continue;
        }
        if c == '{' && chars.get(i + 1) == Some(&'{') {
            let start = i + 2;
            let mut end = start;
            while end + 1 < chars.len() && !(chars[end] == '}' && chars[end + 1] == '}') {
                end += 1;
            }
            if end + 1 >= chars.len() {
                return Err(ExprError::UnterminatedPlaceholder);
            }
            let path: String = chars[start..end].iter().collect();
            tokens.push(Token::Placeholder(path.trim().to_string()));
            i = end + 2;
            continue;
        }
        if c.is_ascii_digit() {
            // After `.` a number is a property name (`items.0.name`), never a fraction.
            let allow_fraction = tokens.last() != Some(&Token::Op("."));
            let start = i;
            while i < chars.len()
                && (chars[i].is_ascii_digit() || (allow_fraction && chars[i] == '.'))
            {
                i += 1;
            }
            let text: String = chars[start..i].iter().collect();
            let n = text
                .parse::<f64>()
                .map_err(|_| ExprError::NotANumber(text.clone()))?;
            tokens.push(Token::Number(n));
            continue;
        }
        if c == '"' || c == '\'' || c == '`' {
            let quote = c;
            let mut text = String::new();
            i += 1;
            loop {
                let Some(&ch) = chars.get(i) else {
                    return Err(ExprError::UnterminatedString);
                };
                i += 1;
                if ch == quote {
                    break;
                }
                if ch == '\\' {
                    let Some(&escaped) = chars.get(i) else {
                        return Err(ExprError::UnterminatedString);
                    };
                    i += 1;
                    text.push(match escaped {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        other => other,
                    });
                } else {
                    text.push(ch);
                }
            }
            tokens.push(Token::Str(text));
            continue;
        }
        if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            tokens.push(Token::Ident(chars[start..i].iter().collect()));
            continue;
        }

        let rest: String = chars[i..chars.len().min(i + 3)].iter().collect();
        let Some(&op) = OPERATORS.iter().find(|op| rest.starts_with(**op)) else {
            return Err(ExprError::UnexpectedChar(c));
        };
        match op {
            "(" | "{" | "[" => nesting += 1,
            ")" | "}" | "]" => nesting = nesting.saturating_sub(1),
            _ => {}
        }
        tokens.push(Token::Op(op));
        i += op.chars().count();
    }

    Ok(tokens)
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Stmt {
    Let(String, Expr),
    Assign(String, Expr),
    Return(Option<Expr>),
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Literal(Value),
    Ident(String),
    Placeholder(String),
    Array(Vec<Expr>),
    Object(Vec<(String, Expr)>),
    Member(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
    Not(Box<Expr>),
    Neg(Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    LooseEq,
    LooseNe,
    StrictEq,
    StrictNe,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOp {
    fn from_token(op: &str) -> Option<Self> {
        Some(match op {
            "+" => Self::Add,
            "-" => Self::Sub,
            "*" => Self::Mul,
            "/" => Self::Div,
            "%" => Self::Rem,
            "==" => Self::LooseEq,
            "!=" => Self::LooseNe,
            "===" => Self::StrictEq,
            "!==" => Self::StrictNe,
            "<" => Self::Lt,
            "<=" => Self::Le,
            ">" => Self::Gt,
            ">=" => Self::Ge,
            _ => return None,
        })
    }

    fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
            Self::LooseEq => "==",
            Self::LooseNe => "!=",
            Self::StrictEq => "===",
            Self::StrictNe => "!==",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn at_op(&self, op: &str) -> bool {
        matches!(self.peek(), Some(Token::Op(o)) if *o == op)
    }

    fn eat_op(&mut self, op: &str) -> bool {
        if self.at_op(op) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_op(&mut self, op: &'static str) -> Result<(), ExprError> {
        match self.advance() {
            Some(Token::Op(o)) if o == op => Ok(()),
            Some(other) => Err(ExprError::UnexpectedToken {
                found: other.describe(),
                expected: format!("'{op}'"),
            }),
            None => Err(ExprError::UnexpectedEnd),
        }
    }

    fn expect_ident(&mut self) -> Result<String, ExprError> {
        match self.advance() {
            Some(Token::Ident(name)) => Ok(name),
            Some(other) => Err(ExprError::UnexpectedToken {
                found: other.describe(),
                expected: "identifier".to_string(),
            }),
            None => Err(ExprError::UnexpectedEnd),
        }
    }

    fn expect_end(&self) -> Result<(), ExprError> {
        match self.peek() {
            None => Ok(()),
            Some(token) => Err(ExprError::UnexpectedToken {
                found: token.describe(),
                expected: "end of input".to_string(),
            }),
        }
    }

    fn skip_separators(&mut self) {
        while matches!(self.peek(), Some(Token::Separator)) {
            self.pos += 1;
        }
    }

    fn program(&mut self) -> Result<Vec<Stmt>, ExprError> {
        let mut statements = Vec::new();
        loop {
            self.skip_separators();
            if self.peek().is_none() {
                return Ok(statements);
            }
            if statements.len() >= MAX_STATEMENTS {
                return Err(ExprError::TooManyStatements);
            }
            statements.push(self.statement()?);
            match self.peek() {
                None | Some(Token::Separator) => {}
                Some(token) => {
                    return Err(ExprError::UnexpectedToken {
                        found: token.describe(),
                        expected: "end of statement".to_string(),
                    });
                }
            }
        }
    }

    fn statement(&mut self) -> Result<Stmt, ExprError> {
        match self.peek() {
            Some(Token::Ident(kw)) if kw == "let" || kw == "const" || kw == "var" => {
                self.pos += 1;
                let name = self.expect_ident()?;
                self.expect_op("=")?;
                Ok(Stmt::Let(name, self.expression()?))
            }
            Some(Token::Ident(kw)) if kw == "return" => {
                self.pos += 1;
                if matches!(self.peek(), None | Some(Token::Separator)) {
                    Ok(Stmt::Return(None))
                } else {
                    Ok(Stmt::Return(Some(self.expression()?)))
                }
            }
            Some(Token::Ident(name))
                if matches!(self.peek_at(1), Some(Token::Op(op)) if *op == "=") =>
            {
                let name = name.clone();
                self.pos += 2;
                Ok(Stmt::Assign(name, self.expression()?))
            }
            _ => Ok(Stmt::Expr(self.expression()?)),
        }
    }

    fn descend(&mut self) -> Result<(), ExprError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ExprError::TooDeep);
        }
        Ok(())
    }

    fn expression(&mut self) -> Result<Expr, ExprError> {
        self.descend()?;
        let expr = self.or();
        self.depth -= 1;
        expr
    }

    // Each link of a left-nested chain adds one level to the tree, so chain
    // loops charge `depth` and give it back once the chain is complete.

    fn or(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.and()?;
        let mut links = 0;
        while self.eat_op("||") {
            self.descend()?;
            links += 1;
            let right = self.and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        self.depth -= links;
        Ok(left)
    }

    fn and(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.equality()?;
        let mut links = 0;
        while self.eat_op("&&") {
            self.descend()?;
            links += 1;
            let right = self.equality()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        self.depth -= links;
        Ok(left)
    }

    fn binary_level(
        &mut self,
        ops: &[&str],
        next: fn(&mut Self) -> Result<Expr, ExprError>,
    ) -> Result<Expr, ExprError> {
        let mut left = next(self)?;
        let mut links = 0;
        loop {
            let Some(Token::Op(op)) = self.peek() else {
                break;
            };
            if !ops.contains(op) {
                break;
            }
            let Some(binary) = BinaryOp::from_token(op) else {
                break;
            };
            self.pos += 1;
            self.descend()?;
            links += 1;
            let right = next(self)?;
            left = Expr::Binary(binary, Box::new(left), Box::new(right));
        }
        self.depth -= links;
        Ok(left)
    }

    fn equality(&mut self) -> Result<Expr, ExprError> {
        self.binary_level(&["==", "!=", "===", "!=="], Self::comparison)
    }

    fn comparison(&mut self) -> Result<Expr, ExprError> {
        self.binary_level(&["<", "<=", ">", ">="], Self::additive)
    }

    fn additive(&mut self) -> Result<Expr, ExprError> {
        self.binary_level(&["+", "-"], Self::multiplicative)
    }

    fn multiplicative(&mut self) -> Result<Expr, ExprError> {
        self.binary_level(&["*", "/", "%"], Self::unary)
    }

    fn unary(&mut self) -> Result<Expr, ExprError> {
        self.descend()?;
        let expr = if self.eat_op("!") {
            self.unary().map(|e| Expr::Not(Box::new(e)))
        } else if self.eat_op("-") {
            self.unary().map(|e| Expr::Neg(Box::new(e)))
        } else {
            self.postfix()
        };
        self.depth -= 1;
        expr
    }

    fn postfix(&mut self) -> Result<Expr, ExprError> {
        let mut expr = self.primary()?;
        let mut links = 0;
        loop {
            if self.eat_op(".") {
                self.descend()?;
                links += 1;
                let property = match self.peek() {
                    Some(Token::Number(n)) => {
                        let index = format_number(*n);
                        self.pos += 1;
                        index
                    }
                    _ => self.expect_ident()?,
                };
                expr = Expr::Member(Box::new(expr), property);
            } else if self.eat_op("[") {
                self.descend()?;
                links += 1;
                let index = self.expression()?;
                self.expect_op("]")?;
                expr = Expr::Index(Box::new(expr), Box::new(index));
            } else {
                self.depth -= links;
                return Ok(expr);
            }
        }
    }

    fn primary(&mut self) -> Result<Expr, ExprError> {
        let Some(token) = self.advance() else {
            return Err(ExprError::UnexpectedEnd);
        };
        match token {
            Token::Number(n) => Ok(Expr::Literal(number(n))),
            Token::Str(s) => Ok(Expr::Literal(Value::String(s))),
            Token::Placeholder(path) => Ok(Expr::Placeholder(path)),
            Token::Ident(name) => match name.as_str() {
                "true" => Ok(Expr::Literal(Value::Bool(true))),
                "false" => Ok(Expr::Literal(Value::Bool(false))),
                "null" | "undefined" => Ok(Expr::Literal(Value::Null)),
                _ if self.at_op("(") => {
                    self.pos += 1;
                    let args = self.list(")")?;
                    Ok(Expr::Call(name, args))
                }
                _ => Ok(Expr::Ident(name)),
            },
            Token::Op("(") => {
                let inner = self.expression()?;
                self.expect_op(")")?;
                Ok(inner)
            }
            Token::Op("[") => Ok(Expr::Array(self.list("]")?)),
            Token::Op("{") => self.object(),
            other => Err(ExprError::UnexpectedToken {
                found: other.describe(),
                expected: "a value".to_string(),
            }),
        }
    }

    /// Comma-separated expressions up to `close`; a trailing comma is allowed.
    fn list(&mut self, close: &'static str) -> Result<Vec<Expr>, ExprError> {
        let mut items = Vec::new();
        while !self.eat_op(close) {
            items.push(self.expression()?);
            if !self.eat_op(",") {
                self.expect_op(close)?;
                break;
            }
        }
        Ok(items)
    }

    fn object(&mut self) -> Result<Expr, ExprError> {
        let mut fields = Vec::new();
        while !self.eat_op("}") {
            let key = match self.advance() {
                Some(Token::Ident(name)) => name,
                Some(Token::Str(s)) => s,
                Some(Token::Number(n)) => format_number(n),
                Some(other) => {
                    return Err(ExprError::UnexpectedToken {
                        found: other.describe(),
                        expected: "property name".to_string(),
                    });
                }
                None => return Err(ExprError::UnexpectedEnd),
            };
            // `{ name }` shorthand.
            let value = if self.eat_op(":") {
                self.expression()?
            } else {
                Expr::Ident(key.clone())
            };
            fields.push((key, value));
            if !self.eat_op(",") {
                self.expect_op("}")?;
                break;
            }
        }
        Ok(Expr::Object(fields))
    }
}

// ---------------------------------------------------------------------------
// Interpreter
// ---------------------------------------------------------------------------

struct Interpreter<'a> {
    context: &'a ExecutionContext,
    locals: HashMap<String, Value>,
    logs: Vec<String>,
}

impl<'a> Interpreter<'a> {
    fn new(context: &'a ExecutionContext) -> Self {
        Self {
            context,
            locals: HashMap::new(),
            logs: Vec::new(),
        }
    }

    fn run(&mut self, program: &[Stmt]) -> Result<Value, ExprError> {
        for stmt in program {
            match stmt {
                Stmt::Let(name, expr) => {
                    let value = bounded(self.eval(expr)?)?;
                    self.locals.insert(name.clone(), value);
                }
                Stmt::Assign(name, expr) => {
                    if !self.locals.contains_key(name) {
                        return Err(ExprError::Undefined(name.clone()));
                    }
                    let value = bounded(self.eval(expr)?)?;
                    self.locals.insert(name.clone(), value);
                }
                Stmt::Return(expr) => {
                    return match expr {
                        Some(expr) => self.eval(expr),
                        None => Ok(Value::Null),
                    };
                }
                Stmt::Expr(expr) => {
                    self.eval(expr)?;
                }
            }
        }
        Ok(Value::Null)
    }

    fn eval(&mut self, expr: &Expr) -> Result<Value, ExprError> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Ident(name) => self.resolve(name),
            Expr::Placeholder(path) => Ok(self.context.lookup(path).cloned().unwrap_or(Value::Null)),
            Expr::Array(items) => items
                .iter()
                .map(|item| self.eval(item))
                .collect::<Result<Vec<_>, _>>()
                .and_then(|items| bounded(Value::Array(items))),
            Expr::Object(fields) => {
                let mut map = Map::new();
                for (key, value) in fields {
                    map.insert(key.clone(), self.eval(value)?);
                }
                bounded(Value::Object(map))
            }
            Expr::Member(target, property) => {
                let target = self.eval(target)?;
                member(&target, property)
            }
            Expr::Index(target, index) => {
                let target = self.eval(target)?;
                let index = self.eval(index)?;
                member(&target, &display_value(&index))
            }
            Expr::Call(name, args) => {
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                bounded(self.call(name, args)?)
            }
            Expr::Not(inner) => Ok(Value::Bool(!truthy(&self.eval(inner)?))),
            Expr::Neg(inner) => {
                let value = self.eval(inner)?;
                Ok(number(-to_number(&value)?))
            }
            Expr::And(left, right) => {
                let left = self.eval(left)?;
                if truthy(&left) { self.eval(right) } else { Ok(left) }
            }
            Expr::Or(left, right) => {
                let left = self.eval(left)?;
                if truthy(&left) { Ok(left) } else { self.eval(right) }
            }
            Expr::Binary(op, left, right) => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                binary(*op, &left, &right)
            }
        }
    }

    fn resolve(&self, name: &str) -> Result<Value, ExprError> {
        if let Some(value) = self.locals.get(name) {
            return Ok(value.clone());
        }
        if name == "context" {
            return Ok(self.context.as_value());
        }
        self.context
            .lookup(name)
            .cloned()
            .ok_or_else(|| ExprError::Undefined(name.to_string()))
    }

    fn call(&mut self, name: &str, args: Vec<Value>) -> Result<Value, ExprError> {
        let arity = |expected: usize| {
            if args.len() == expected {
                Ok(())
            } else {
                Err(ExprError::Arity {
                    name: name.to_string(),
                    expected,
                    got: args.len(),
                })
            }
        };

        match name {
            "log" => {
                let line = args.iter().map(display_value).collect::<Vec<_>>().join(" ");
                self.logs.push(line);
                Ok(Value::Null)
            }
            "len" => {
                arity(1)?;
                Ok(number(length(&args[0]) as f64))
            }
            "upper" => {
                arity(1)?;
                Ok(Value::String(display_value(&args[0]).to_uppercase()))
            }
            "lower" => {
                arity(1)?;
                Ok(Value::String(display_value(&args[0]).to_lowercase()))
            }
            "trim" => {
                arity(1)?;
                Ok(Value::String(display_value(&args[0]).trim().to_string()))
            }
            "contains" => {
                arity(2)?;
                Ok(Value::Bool(string_contains(&args[0], &args[1])))
            }
            "str" => {
                arity(1)?;
                Ok(Value::String(display_value(&args[0])))
            }
            "num" => {
                arity(1)?;
                Ok(number(to_number(&args[0])?))
            }
            _ => Err(ExprError::UnknownFunction(name.to_string())),
        }
    }
}

fn member(target: &Value, property: &str) -> Result<Value, ExprError> {
    if target.is_null() {
        return Err(ExprError::NullAccess {
            property: property.to_string(),
        });
    }
    if property == "length" && matches!(target, Value::String(_) | Value::Array(_)) {
        return Ok(number(length(target) as f64));
    }
    if let Value::String(s) = target {
        return Ok(property
            .parse::<usize>()
            .ok()
            .and_then(|i| s.chars().nth(i))
            .map(|c| Value::String(c.to_string()))
            .unwrap_or(Value::Null));
    }
    Ok(step_into(target, property).cloned().unwrap_or(Value::Null))
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, ExprError> {
    let result = match op {
        BinaryOp::Add => {
            if left.is_string() || right.is_string() {
                return bounded(Value::String(display_value(left) + &display_value(right)));
            }
            arithmetic(op, left, right, |l, r| Ok(l + r))?
        }
        BinaryOp::Sub => arithmetic(op, left, right, |l, r| Ok(l - r))?,
        BinaryOp::Mul => arithmetic(op, left, right, |l, r| Ok(l * r))?,
        BinaryOp::Div => arithmetic(op, left, right, |l, r| {
            if r == 0.0 {
                Err(ExprError::DivisionByZero)
            } else {
                Ok(l / r)
            }
        })?,
        BinaryOp::Rem => arithmetic(op, left, right, |l, r| {
            if r == 0.0 {
                Err(ExprError::DivisionByZero)
            } else {
                Ok(l % r)
            }
        })?,
        BinaryOp::LooseEq => Value::Bool(values_equal(left, right)),
        BinaryOp::LooseNe => Value::Bool(!values_equal(left, right)),
        BinaryOp::StrictEq => Value::Bool(strict_equal(left, right)),
        BinaryOp::StrictNe => Value::Bool(!strict_equal(left, right)),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            Value::Bool(compare(op, left, right))
        }
    };
    Ok(result)
}

fn arithmetic(
    op: BinaryOp,
    left: &Value,
    right: &Value,
    apply: impl Fn(f64, f64) -> Result<f64, ExprError>,
) -> Result<Value, ExprError> {
    let (Some(l), Some(r)) = (numeric(left), numeric(right)) else {
        return Err(ExprError::TypeMismatch {
            op: op.symbol(),
            left: type_name(left),
            right: type_name(right),
        });
    };
    Ok(number(apply(l, r)?))
}

fn compare(op: BinaryOp, left: &Value, right: &Value) -> bool {
    if let (Value::String(l), Value::String(r)) = (left, right) {
        return match op {
            BinaryOp::Lt => l < r,
            BinaryOp::Le => l <= r,
            BinaryOp::Gt => l > r,
            _ => l >= r,
        };
    }
    let (left, right) = (
        numeric(left).map(number).unwrap_or(Value::Null),
        numeric(right).map(number).unwrap_or(Value::Null),
    );
    match op {
        BinaryOp::Lt => compare_numbers(&left, &right, |l, r| l < r),
        BinaryOp::Le => compare_numbers(&left, &right, |l, r| l <= r),
        BinaryOp::Gt => compare_numbers(&left, &right, |l, r| l > r),
        _ => compare_numbers(&left, &right, |l, r| l >= r),
    }
}

fn strict_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(_), Value::Number(_)) => values_equal(left, right),
        _ => std::mem::discriminant(left) == std::mem::discriminant(right) && left == right,
    }
}

/// Numeric view for arithmetic: numbers, numeric strings, booleans and null.
fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Null => Some(0.0),
        other => value_as_f64(other),
    }
}

fn to_number(value: &Value) -> Result<f64, ExprError> {
    numeric(value).ok_or_else(|| ExprError::NotANumber(display_value(value)))
}

/// Reject values whose size passes `MAX_VALUE_SIZE`. The walk stops as soon
/// as the budget is spent.
fn bounded(value: Value) -> Result<Value, ExprError> {
    let mut size = 0usize;
    let mut pending = vec![&value];
    while let Some(current) = pending.pop() {
        size += match current {
            Value::String(s) => s.len().max(1),
            Value::Array(items) => {
                pending.extend(items);
                1
            }
            Value::Object(map) => {
                pending.extend(map.values());
                1 + map.keys().map(String::len).sum::<usize>()
            }
            _ => 1,
        };
        if size > MAX_VALUE_SIZE {
            return Err(ExprError::TooLarge);
        }
    }
    Ok(value)
}

fn length(value: &Value) -> usize {
    match value {
        Value::String(s) => s.chars().count(),
        Value::Array(items) => items.len(),
        Value::Object(map) => map.len(),
        _ => 0,
    }
}

fn number(n: f64) -> Value {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 9.0e15 {
        Value::Number(Number::from(n as i64))
    } else {
        Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}

pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
