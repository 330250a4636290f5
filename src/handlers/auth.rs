use crate::middlewares::current_user_id;
use crate::models::*;
use crate::services::{AuthService, ClientInfo};
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};

#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "登录成功", body = UserInfo),
        (status = 401, description = "认证失败"),
        (status = 400, description = "请求参数错误")
    )
)]
pub async fn login(
    auth_service: web::Data<AuthService>,
    request: web::Json<LoginRequest>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let client = ClientInfo::from_request(&req);
    match auth_service.login(request.into_inner(), &client).await {
        Ok(user) => Ok(HttpResponse::Ok().json(ApiResponse::ok_with_message("登录成功", user))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/auth/login/phone",
    tag = "auth",
    request_body = PhoneLoginRequest,
    responses(
        (status = 200, description = "登录成功", body = UserInfo),
        (status = 400, description = "验证码错误或手机号未注册"),
        (status = 403, description = "账号已被禁用")
    )
)]
pub async fn login_by_phone(
    auth_service: web::Data<AuthService>,
    request: web::Json<PhoneLoginRequest>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let client = ClientInfo::from_request(&req);
    match auth_service
        .login_by_phone(request.into_inner(), &client)
        .await
    {
        Ok(user) => Ok(HttpResponse::Ok().json(ApiResponse::ok_with_message("登录成功", user))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/auth/userinfo",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "获取用户信息成功", body = UserInfo),
        (status = 401, description = "未登录")
    )
)]
pub async fn get_userinfo(
    auth_service: web::Data<AuthService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user_id = match current_user_id(&req) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };
    match auth_service.get_user_info(user_id).await {
        Ok(user) => Ok(HttpResponse::Ok().json(ApiResponse::ok(user))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/auth/userinfo",
    tag = "auth",
    security(("bearer_auth" = [])),
    request_body = UserUpdateRequest,
    responses(
        (status = 200, description = "更新用户信息成功", body = UserInfo),
        (status = 400, description = "请求参数错误"),
        (status = 401, description = "未登录")
    )
)]
pub async fn update_userinfo(
    auth_service: web::Data<AuthService>,
    request: web::Json<UserUpdateRequest>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user_id = match current_user_id(&req) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };
    match auth_service
        .update_user_info(user_id, request.into_inner())
        .await
    {
        Ok(user) => Ok(HttpResponse::Ok().json(ApiResponse::ok_with_message("更新成功", user))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/auth/sms/code",
    tag = "auth",
    security(("bearer_auth" = [])),
    params(SmsCodeQuery),
    responses(
        (status = 200, description = "验证码发送成功", body = SmsCodeResponse),
        (status = 400, description = "手机号格式错误"),
        (status = 429, description = "发送过于频繁")
    )
)]
pub async fn send_sms_code(
    auth_service: web::Data<AuthService>,
    query: web::Query<SmsCodeQuery>,
) -> Result<HttpResponse> {
    match auth_service.send_sms_code(&query.phone).await {
        Ok(code) => Ok(HttpResponse::Ok().json(ApiResponse::ok_with_message(
            "验证码已发送",
            SmsCodeResponse { code },
        ))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/auth/phone/bind",
    tag = "auth",
    security(("bearer_auth" = [])),
    request_body = PhoneBindRequest,
    responses(
        (status = 200, description = "绑定成功"),
        (status = 400, description = "验证码错误或手机号已被绑定"),
        (status = 401, description = "未登录")
    )
)]
pub async fn bind_phone(
    auth_service: web::Data<AuthService>,
    request: web::Json<PhoneBindRequest>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user_id = match current_user_id(&req) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };
    match auth_service.bind_phone(user_id, request.into_inner()).await {
        Ok(()) => Ok(HttpResponse::Ok().json(ApiResponse::ok_with_message("绑定成功", ()))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn auth_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .route("/login", web::post().to(login))
            .route("/login/phone", web::post().to(login_by_phone))
            .route("/userinfo", web::get().to(get_userinfo))
            .route("/userinfo", web::put().to(update_userinfo))
            .route("/sms/code", web::post().to(send_sms_code))
            .route("/phone/bind", web::post().to(bind_phone)),
    );
}
