use serde::{Deserialize, Serialize};

/// Description of one message cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterDescription {
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    pub rounds: usize,
    pub oracle_calls: usize,
}
