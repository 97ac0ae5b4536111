//! Tool declarations bound to storage queues

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Name the file tool is declared under
pub const FILE_MANAGER_TOOL: &str = "FileManager";

/// A tool capability declared on an agent
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolDefinition {
    /// Tool invoked out of process over an input/output queue pair
    AzureFunction { azure_function: AzureFunctionTool },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AzureFunctionTool {
    pub function: FunctionDefinition,
    pub input_binding: QueueBinding,
    pub output_binding: QueueBinding,
}

/// Name, description and JSON Schema of a callable function
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueueBinding {
    StorageQueue { storage_queue: StorageQueue },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageQueue {
    pub queue_service_endpoint: String,
    pub queue_name: String,
}

impl QueueBinding {
    pub fn storage_queue(endpoint: impl Into<String>, queue_name: impl Into<String>) -> Self {
        QueueBinding::StorageQueue {
            storage_queue: StorageQueue {
                queue_service_endpoint: endpoint.into(),
                queue_name: queue_name.into(),
            },
        }
    }
}

impl ToolDefinition {
    /// The file management tool, routed through `input_queue` and `output_queue`
    /// at `queue_endpoint`.
    pub fn file_manager(queue_endpoint: &str, input_queue: &str, output_queue: &str) -> Self {
        ToolDefinition::AzureFunction {
            azure_function: AzureFunctionTool {
                function: FunctionDefinition {
                    name: FILE_MANAGER_TOOL.to_string(),
                    description: "Manage files in Azure Storage.".to_string(),
                    parameters: file_manager_parameters(),
                },
                input_binding: QueueBinding::storage_queue(queue_endpoint, input_queue),
                output_binding: QueueBinding::storage_queue(queue_endpoint, output_queue),
            },
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ToolDefinition::AzureFunction { azure_function } => &azure_function.function.name,
        }
    }
}

fn file_manager_parameters() -> Value {
    json!({
        "type": "object",
        "properties": {
            "fileName": { "type": "string", "description": "The name of the file to manage." },
            "command": { "type": "string", "description": "The command to execute on the file." },
            "mode": { "type": "string", "description": "The mode of the tool behavior." }
        },
        "required": ["fileName", "command", "mode"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_manager_wire_shape() {
        let tool = ToolDefinition::file_manager("https://acct.queue.core.windows.net", "input", "output");
        let wire = serde_json::to_value(&tool).unwrap();

        assert_eq!(wire["type"], "azure_function");
        let function = &wire["azure_function"]["function"];
        assert_eq!(function["name"], "FileManager");
        assert_eq!(function["parameters"]["required"], json!(["fileName", "command", "mode"]));

        let input = &wire["azure_function"]["input_binding"];
        assert_eq!(input["type"], "storage_queue");
        assert_eq!(input["storage_queue"]["queue_name"], "input");
        assert_eq!(
            input["storage_queue"]["queue_service_endpoint"],
            "https://acct.queue.core.windows.net"
        );
        assert_eq!(wire["azure_function"]["output_binding"]["storage_queue"]["queue_name"], "output");
    }
}
