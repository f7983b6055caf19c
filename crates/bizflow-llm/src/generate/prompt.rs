use bizflow_core::NodeKind;

fn node_type_list() -> String {
    NodeKind::ALL
        .iter()
        .map(NodeKind::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

pub(crate) fn system_prompt() -> String {
    "You are an expert business process automation assistant. \
     Reply with JSON only, no commentary."
        .to_string()
}

pub(crate) fn workflow_prompt(request: &str) -> String {
    format!(
        r#"Based on the user's request, generate a logical sequence of workflow steps.
The available step types are: {types}.
Your response must be a JSON array of objects, each shaped like
{{"type": "<one of the step types>", "label": "<concise, user-friendly label>"}}.
Each object in the array represents one step in the workflow.

User Request: "{request}""#,
        types = node_type_list(),
    )
}

pub(crate) fn node_prompt(request: &str) -> String {
    format!(
        r#"Analyze the user's request and choose the single best workflow node type to accomplish it.
The available node types are: {types}.
Your response must be a single JSON object shaped like
{{"type": "<one of the node types>", "label": "<concise, user-friendly label>"}}.

User Request: "{request}""#,
        types = node_type_list(),
    )
}
