use serde::{Deserialize, Serialize};

/// 插件响应信封
///
/// Serialized with the `status` field as the tag, so a success carries the
/// body's own fields next to `"status": "success"` and an error is
/// `{"status": "error", "error": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Response<T> {
    Success(T),
    Error { error: String },
}

impl<T> Response<T> {
    pub fn success(body: T) -> Self {
        Response::Success(body)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Response::Error {
            error: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Response::Success(_))
    }
}

/// Body of a successful greeting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Greeting {
    pub message: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
}

/// 插件能力元数据（状态接口返回）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub status: HealthStatus,
    pub plugin: String,
    pub version: String,
    pub endpoints: Vec<String>,
}

impl StatusReport {
    pub fn healthy(plugin: &str, version: &str, endpoints: &[&str]) -> Self {
        Self {
            status: HealthStatus::Healthy,
            plugin: plugin.to_string(),
            version: version.to_string(),
            endpoints: endpoints.iter().map(|e| e.to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_flattens_body() {
        let response = Response::success(Greeting {
            message: "Hello World!".into(),
            name: "World".into(),
        });
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(
            value,
            json!({"status": "success", "message": "Hello World!", "name": "World"})
        );
    }

    #[test]
    fn test_error_shape() {
        let response: Response<Greeting> = Response::error("Missing 'name' parameter");
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value, json!({"status": "error", "error": "Missing 'name' parameter"}));

        let back: Response<Greeting> = serde_json::from_value(value).unwrap();
        assert!(!back.is_success());
    }

    #[test]
    fn test_status_report_shape() {
        let report = StatusReport::healthy("k8s-get", "1.0.1", &["/k8s"]);
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(
            value,
            json!({"status": "healthy", "plugin": "k8s-get", "version": "1.0.1", "endpoints": ["/k8s"]})
        );
    }
}
