use std::fmt;
use std::str::FromStr;

use chrono::Datelike;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

use crate::NodeData;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown node type: {0}")]
pub struct UnknownNodeKind(pub String);

/// Every automation step a workflow node can perform.
///
/// The kind is fixed when the node is created. It selects the default data,
/// the validation rules and the execution handler for the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeKind {
    Trigger,
    SendEmail,
    GenerateDocument,
    FileTaxes,
    UpdateCrm,
    SocialPost,
    Wait,
    IfCondition,
    LoopStart,
    LoopEnd,
    Code,
    QueryDatabase,
    ConnectApi,
    Logger,
    BrowsingAgent,
    RegisterBusiness,
    ExpandBusiness,
    Dashboard,
    CreateWebsite,
    ManageInvoices,
    MarketResearch,
    ComplianceCheck,
    HireEmployee,
}

impl NodeKind {
    pub const ALL: [NodeKind; 23] = [
        NodeKind::Trigger,
        NodeKind::SendEmail,
        NodeKind::GenerateDocument,
        NodeKind::FileTaxes,
        NodeKind::UpdateCrm,
        NodeKind::SocialPost,
        NodeKind::Wait,
        NodeKind::IfCondition,
        NodeKind::LoopStart,
        NodeKind::LoopEnd,
        NodeKind::Code,
        NodeKind::QueryDatabase,
        NodeKind::ConnectApi,
        NodeKind::Logger,
        NodeKind::BrowsingAgent,
        NodeKind::RegisterBusiness,
        NodeKind::ExpandBusiness,
        NodeKind::Dashboard,
        NodeKind::CreateWebsite,
        NodeKind::ManageInvoices,
        NodeKind::MarketResearch,
        NodeKind::ComplianceCheck,
        NodeKind::HireEmployee,
    ];

    /// Wire name, as used in workflow documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Trigger => "TRIGGER",
            NodeKind::SendEmail => "SEND_EMAIL",
            NodeKind::GenerateDocument => "GENERATE_DOCUMENT",
            NodeKind::FileTaxes => "FILE_TAXES",
            NodeKind::UpdateCrm => "UPDATE_CRM",
            NodeKind::SocialPost => "SOCIAL_POST",
            NodeKind::Wait => "WAIT",
            NodeKind::IfCondition => "IF_CONDITION",
            NodeKind::LoopStart => "LOOP_START",
            NodeKind::LoopEnd => "LOOP_END",
            NodeKind::Code => "CODE",
            NodeKind::QueryDatabase => "QUERY_DATABASE",
            NodeKind::ConnectApi => "CONNECT_API",
            NodeKind::Logger => "LOGGER",
            NodeKind::BrowsingAgent => "BROWSING_AGENT",
            NodeKind::RegisterBusiness => "REGISTER_BUSINESS",
            NodeKind::ExpandBusiness => "EXPAND_BUSINESS",
            NodeKind::Dashboard => "DASHBOARD",
            NodeKind::CreateWebsite => "CREATE_WEBSITE",
            NodeKind::ManageInvoices => "MANAGE_INVOICES",
            NodeKind::MarketResearch => "MARKET_RESEARCH",
            NodeKind::ComplianceCheck => "COMPLIANCE_CHECK",
            NodeKind::HireEmployee => "HIRE_EMPLOYEE",
        }
    }

    pub fn default_label(&self) -> &'static str {
        match self {
            NodeKind::Trigger => "Trigger",
            NodeKind::SendEmail => "Send Email",
            NodeKind::GenerateDocument => "Generate Document",
            NodeKind::FileTaxes => "File Taxes",
            NodeKind::UpdateCrm => "Update CRM",
            NodeKind::SocialPost => "Social Post",
            NodeKind::Wait => "Wait",
            NodeKind::IfCondition => "If/Else Condition",
            NodeKind::LoopStart => "Start Loop",
            NodeKind::LoopEnd => "End Loop",
            NodeKind::Code => "Code",
            NodeKind::QueryDatabase => "Query Database",
            NodeKind::ConnectApi => "Connect to API",
            NodeKind::Logger => "Logger",
            NodeKind::BrowsingAgent => "Browsing Agent",
            NodeKind::RegisterBusiness => "Register Business",
            NodeKind::ExpandBusiness => "Expand Business",
            NodeKind::Dashboard => "Dashboard",
            NodeKind::CreateWebsite => "Create Website",
            NodeKind::ManageInvoices => "Manage Invoices",
            NodeKind::MarketResearch => "Market Research",
            NodeKind::ComplianceCheck => "Compliance Check",
            NodeKind::HireEmployee => "Hire Employee",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            NodeKind::Trigger => "Starts the workflow based on an event.",
            NodeKind::SendEmail => "Sends a transactional or marketing email.",
            NodeKind::GenerateDocument => "Creates a document from a template.",
            NodeKind::FileTaxes => "Prepares and files tax documents.",
            NodeKind::UpdateCrm => "Updates a record in your CRM.",
            NodeKind::SocialPost => "Posts a message to a social media platform.",
            NodeKind::Wait => "Pauses the workflow for a set duration.",
            NodeKind::IfCondition => "Splits the workflow based on a condition.",
            NodeKind::LoopStart => "Repeats steps while a condition is true.",
            NodeKind::LoopEnd => "Marks the end of a loop iteration.",
            NodeKind::Code => "Evaluates a sandboxed script against the run context.",
            NodeKind::QueryDatabase => "Run a query against your database.",
            NodeKind::ConnectApi => "Make an HTTP request to an external API.",
            NodeKind::Logger => "Logs a message for debugging purposes.",
            NodeKind::BrowsingAgent => "Automates tasks on a website.",
            NodeKind::RegisterBusiness => "Registers a new business entity.",
            NodeKind::ExpandBusiness => "Creates a plan to expand business operations.",
            NodeKind::Dashboard => "Visualizes data from other workflow steps.",
            NodeKind::CreateWebsite => "Automates the creation of a business website.",
            NodeKind::ManageInvoices => "Create, send, or track invoices.",
            NodeKind::MarketResearch => "Uses AI to perform market research.",
            NodeKind::ComplianceCheck => "Checks for business compliance in a region.",
            NodeKind::HireEmployee => "Automates steps in the hiring process.",
        }
    }

    /// Data seeded into a freshly created node of this kind.
    pub fn default_data(&self) -> NodeData {
        let value = match self {
            NodeKind::Trigger => json!({ "condition": "On New User Signup" }),
            NodeKind::SendEmail => json!({
                "to": "{{user.email}}",
                "subject": "Welcome!",
                "body": "Hello {{user.name}}!",
            }),
            NodeKind::GenerateDocument => json!({ "template": "contract.docx", "format": "pdf" }),
            NodeKind::FileTaxes => json!({
                "country": "USA",
                "year": chrono::Utc::now().year(),
                "form": "1040",
            }),
            NodeKind::UpdateCrm => json!({ "record": "{{user.id}}", "status": "Onboarded" }),
            NodeKind::SocialPost => json!({
                "platform": "Twitter",
                "content": "Welcome our new client!",
                "targetAudience": "Global",
            }),
            NodeKind::Wait => json!({ "duration": "1", "unit": "days" }),
            NodeKind::IfCondition => json!({ "condition": "{{user.isSubscribed}} == true" }),
            NodeKind::LoopStart => json!({ "condition": "{{item.status}} !== \"processed\"" }),
            NodeKind::LoopEnd => json!({}),
            NodeKind::Code => json!({ "code": "log(\"Hello, World!\");\nreturn { success: true };" }),
            NodeKind::QueryDatabase => json!({
                "credentialId": "",
                "query": "SELECT * FROM users LIMIT 10;",
            }),
            NodeKind::ConnectApi => json!({
                "credentialId": "",
                "method": "GET",
                "url": "https://api.example.com/data",
                "headers": "{\n  \"Content-Type\": \"application/json\"\n}",
                "body": "{\n  \"key\": \"value\"\n}",
            }),
            NodeKind::Logger => json!({ "message": "Log: {{ some_variable }}" }),
            NodeKind::BrowsingAgent => json!({
                "url": "https://example.com",
                "task": "Summarize the main content.",
            }),
            NodeKind::RegisterBusiness => json!({
                "businessName": "My NewCo",
                "businessType": "LLC",
                "country": "USA",
            }),
            NodeKind::ExpandBusiness => json!({ "strategy": "Launch marketing in new region" }),
            NodeKind::Dashboard => json!({ "chartType": "Bar", "data": "{{query_result}}" }),
            NodeKind::CreateWebsite => json!({
                "siteName": "My Awesome Site",
                "businessType": "E-commerce",
                "template": "Modern",
            }),
            NodeKind::ManageInvoices => json!({
                "action": "Create",
                "client": "Client Name",
                "amount": 1000,
                "currency": "USD",
            }),
            NodeKind::MarketResearch => json!({
                "topic": "Competitor analysis for SaaS products",
                "market": "Global",
            }),
            NodeKind::ComplianceCheck => json!({ "checkType": "GDPR", "region": "EU" }),
            NodeKind::HireEmployee => json!({
                "role": "Software Engineer",
                "status": "Send Offer Letter",
            }),
        };
        match value {
            Value::Object(map) => map,
            _ => NodeData::new(),
        }
    }

    /// Kinds that legitimately end a path and need no outgoing edge.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            NodeKind::LoopEnd | NodeKind::SendEmail | NodeKind::Logger
        )
    }

    /// Kinds that must reference a stored credential via `data.credentialId`.
    pub fn requires_credential(&self) -> bool {
        matches!(self, NodeKind::ConnectApi | NodeKind::QueryDatabase)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = UnknownNodeKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        NodeKind::ALL
            .into_iter()
            .find(|k| k.as_str() == trimmed)
            .ok_or_else(|| UnknownNodeKind(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_round_trip_through_from_str() {
        for kind in NodeKind::ALL {
            assert_eq!(kind.as_str().parse::<NodeKind>().unwrap(), kind);
            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json, Value::String(kind.as_str().to_string()));
        }
    }

    #[test]
    fn unknown_names_are_rejected() {
        let err = "SEND_FAX".parse::<NodeKind>().unwrap_err();
        assert_eq!(err, UnknownNodeKind("SEND_FAX".to_string()));
        assert!("send_email".parse::<NodeKind>().is_err());
    }

    #[test]
    fn default_data_is_seeded_per_kind() {
        let email = NodeKind::SendEmail.default_data();
        assert_eq!(email["to"], "{{user.email}}");

        let wait = NodeKind::Wait.default_data();
        assert_eq!(wait["duration"], "1");
        assert_eq!(wait["unit"], "days");

        assert!(NodeKind::LoopEnd.default_data().is_empty());
        assert!(NodeKind::FileTaxes.default_data()["year"].is_i64());
    }

    #[test]
    fn terminal_and_credential_sets() {
        assert!(NodeKind::Logger.is_terminal());
        assert!(!NodeKind::Trigger.is_terminal());
        assert!(NodeKind::QueryDatabase.requires_credential());
        assert!(!NodeKind::Wait.requires_credential());
    }
}
