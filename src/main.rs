use actix_web::{App, HttpServer, middleware::Logger, web};
use chrono::Local; // timestamp in log lines
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter
use std::sync::Arc;

use skyreel_backend::{
    cache::MemoryCache,
    config::Config,
    database::{create_pool, run_migrations},
    external::WeChatClient,
    handlers,
    middlewares::{AuthMiddleware, create_cors},
    providers::ProviderRegistry,
    services::*,
    swagger::swagger_config,
    tasks::{TaskQueue, spawn_workers},
    utils::JwtService,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    // 加载配置
    let config = Config::from_toml().expect("Failed to load configuration file");

    // 创建数据库连接池
    let pool = create_pool(&config.database)
        .await
        .expect("Failed to create database connection pool");

    // 运行数据库迁移
    run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    // 创建JWT服务
    let jwt_service = JwtService::new(&config.jwt.secret, config.jwt.expires_in);

    // 创建外部服务与缓存
    let wechat_client = WeChatClient::new(config.wechat.clone());
    let cache = MemoryCache::new();

    // 创建服务
    let credit_service = CreditService::new(pool.clone());
    let auth_service = AuthService::new(
        pool.clone(),
        jwt_service.clone(),
        Arc::new(wechat_client),
        credit_service.clone(),
        cache,
        config.user.clone(),
    );

    let registry = Arc::new(ProviderRegistry::from_config(&config.video));
    log::info!("已注册视频provider: {:?}", registry.provider_names());

    let (queue, rx) = TaskQueue::new(config.video.queue_capacity);
    let video_service = VideoTaskService::new(
        pool.clone(),
        registry,
        credit_service.clone(),
        queue,
        config.video.clone(),
    );

    // 启动恢复：重启前未完结的任务重新入队
    match video_service.recover_pending().await {
        Ok(n) if n > 0 => log::info!("启动恢复: 重新入队{n}个未完结任务"),
        Ok(_) => {}
        Err(e) => log::error!("启动恢复失败: {e}"),
    }

    // 启动后台生成worker池
    spawn_workers(video_service.clone(), rx, config.video.worker_count);

    // 启动HTTP服务器
    log::info!(
        "Starting HTTP server at {}:{}",
        config.server.host,
        config.server.port
    );

    let jwt_config = config.jwt.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(create_cors())
            .wrap(AuthMiddleware::new(jwt_service.clone(), &jwt_config))
            .app_data(web::Data::new(auth_service.clone()))
            .app_data(web::Data::new(credit_service.clone()))
            .app_data(web::Data::new(video_service.clone()))
            .configure(swagger_config)
            .service(
                web::scope("/api")
                    .configure(handlers::auth_config)
                    .configure(handlers::credit_config)
                    .configure(handlers::video_config),
            )
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}
