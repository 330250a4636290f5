use crate::middlewares::current_user_id;
use crate::models::*;
use crate::providers::VideoTaskDto;
use crate::services::VideoTaskService;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};

#[utoipa::path(
    post,
    path = "/video/generate",
    tag = "video",
    security(("bearer_auth" = [])),
    request_body = VideoGenerationRequest,
    responses(
        (status = 200, description = "任务提交成功", body = VideoTaskDto),
        (status = 400, description = "请求参数错误或积分不足"),
        (status = 401, description = "未登录")
    )
)]
pub async fn generate_video(
    video_service: web::Data<VideoTaskService>,
    request: web::Json<VideoGenerationRequest>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user_id = match current_user_id(&req) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };
    match video_service.create_task(request.into_inner(), user_id).await {
        Ok(dto) => Ok(HttpResponse::Ok().json(ApiResponse::ok_with_message("任务提交成功", dto))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/video/task/{id}",
    tag = "video",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "任务ID")),
    responses(
        (status = 200, description = "查询任务成功", body = VideoTaskDto),
        (status = 404, description = "任务不存在"),
        (status = 401, description = "未登录")
    )
)]
pub async fn get_video_task(
    video_service: web::Data<VideoTaskService>,
    path: web::Path<i64>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user_id = match current_user_id(&req) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };
    match video_service.query_task(path.into_inner(), user_id).await {
        Ok(dto) => Ok(HttpResponse::Ok().json(ApiResponse::ok(dto))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/video/tasks",
    tag = "video",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "获取任务列表成功"),
        (status = 401, description = "未登录")
    )
)]
pub async fn get_video_tasks(
    video_service: web::Data<VideoTaskService>,
    query: web::Query<PageQuery>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user_id = match current_user_id(&req) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };
    match video_service.get_user_tasks(user_id, &query).await {
        Ok(page) => Ok(HttpResponse::Ok().json(ApiResponse::ok(page))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn video_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/video")
            .route("/generate", web::post().to(generate_video))
            .route("/task/{id}", web::get().to(get_video_task))
            .route("/tasks", web::get().to(get_video_tasks)),
    );
}
