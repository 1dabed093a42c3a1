use kplug_sdk::{
    debug, export_handler, export_plugin_alloc, export_static, info, Fields, FromPayload, Greeting, Response,
    StatusReport, ValidationError,
};

pub const PLUGIN_NAME: &str = "k8s-get";
pub const PLUGIN_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const ENDPOINTS: &[&str] = &["/k8s"];

export_plugin_alloc!();

// 主处理入口：handle_k8s(ptr, len) -> packed word
export_handler!(handle_k8s, GreetRequest, greet);

// 状态接口：不读取任何输入
export_static!(handle_status, status_report);

/// Request accepted by `handle_k8s`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GreetRequest {
    pub name: String,
}

impl FromPayload for GreetRequest {
    fn from_payload(fields: &Fields<'_>) -> Result<Self, ValidationError> {
        Ok(Self {
            name: fields.required_str("name")?.to_string(),
        })
    }
}

pub fn greet(request: GreetRequest) -> Response<Greeting> {
    debug!("greeting request for {} byte name", request.name.len());
    let message = format!("Hello {}!", request.name);
    info!("{}", message);
    Response::success(Greeting {
        message,
        name: request.name,
    })
}

pub fn status_report() -> StatusReport {
    StatusReport::healthy(PLUGIN_NAME, PLUGIN_VERSION, ENDPOINTS)
}
