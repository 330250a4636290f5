use crate::middlewares::current_user_id;
use crate::models::*;
use crate::services::CreditService;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};

#[utoipa::path(
    get,
    path = "/credit/balance",
    tag = "credit",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "获取余额成功", body = BalanceResponse),
        (status = 401, description = "未登录")
    )
)]
pub async fn get_balance(
    credit_service: web::Data<CreditService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user_id = match current_user_id(&req) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };
    match credit_service.get_balance(user_id).await {
        Ok(balance) => {
            Ok(HttpResponse::Ok().json(ApiResponse::ok(BalanceResponse { balance })))
        }
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/credit/logs",
    tag = "credit",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "获取积分流水成功"),
        (status = 401, description = "未登录")
    )
)]
pub async fn get_credit_logs(
    credit_service: web::Data<CreditService>,
    query: web::Query<PageQuery>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user_id = match current_user_id(&req) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };
    match credit_service.get_credit_logs(user_id, &query).await {
        Ok(page) => Ok(HttpResponse::Ok().json(ApiResponse::ok(page))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn credit_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/credit")
            .route("/balance", web::get().to(get_balance))
            .route("/logs", web::get().to(get_credit_logs)),
    );
}
