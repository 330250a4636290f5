use actix_web::web;
use utoipa::OpenApi;
use utoipa::{
    Modify,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;
use crate::models::*;
use crate::providers::VideoTaskDto;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.as_mut().unwrap();
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        )
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::login,
        handlers::auth::login_by_phone,
        handlers::auth::get_userinfo,
        handlers::auth::update_userinfo,
        handlers::auth::send_sms_code,
        handlers::auth::bind_phone,
        handlers::credit::get_balance,
        handlers::credit::get_credit_logs,
        handlers::video::generate_video,
        handlers::video::get_video_task,
        handlers::video::get_video_tasks,
    ),
    components(
        schemas(
            LoginRequest,
            UserInfo,
            UserUpdateRequest,
            SmsCodeQuery,
            SmsCodeResponse,
            PhoneBindRequest,
            PhoneLoginRequest,
            BalanceResponse,
            CreditLogItem,
            VideoGenerationRequest,
            VideoTaskItem,
            VideoTaskDto,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "微信登录与用户信息"),
        (name = "credit", description = "积分余额与流水"),
        (name = "video", description = "视频生成任务"),
    ),
    info(
        title = "SkyReel Backend API",
        version = "1.0.0",
        description = "SkyReel AI视频生成后端 REST API 文档"
    ),
    servers(
        (url = "/api", description = "Local server")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}
