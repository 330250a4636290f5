use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub wechat: WeChatConfig,
    #[serde(default)]
    pub user: UserConfig,
    #[serde(default)]
    pub video: VideoConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    /// token有效期，秒
    pub expires_in: i64,
    #[serde(default = "default_jwt_header")]
    pub header: String,
    #[serde(default = "default_jwt_prefix")]
    pub prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeChatConfig {
    pub app_id: String,
    pub app_secret: String,
    #[serde(default = "default_wechat_base_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    /// 新用户注册赠送的积分
    pub register_bonus_credits: i32,
    /// 开发环境下在响应中回显短信验证码
    pub sms_debug_echo: bool,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            register_bonus_credits: 100,
            sms_debug_echo: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    pub default_provider: String,
    pub poll_interval_secs: u64,
    pub max_poll_attempts: u32,
    /// 后台生成任务的并发工作协程数
    pub worker_count: usize,
    pub queue_capacity: usize,
    /// 轮询超时的任务是否退还积分
    pub refund_on_expired: bool,
    pub sora_proxy: SoraProxyConfig,
    pub wenwenai: WenwenaiConfig,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            default_provider: "sora-proxy".to_string(),
            poll_interval_secs: 5,
            max_poll_attempts: 60,
            worker_count: 4,
            queue_capacity: 256,
            refund_on_expired: true,
            sora_proxy: SoraProxyConfig::default(),
            wenwenai: WenwenaiConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SoraProxyConfig {
    pub enabled: bool,
    pub api_key: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for SoraProxyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: String::new(),
            base_url: String::new(),
            timeout_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WenwenaiConfig {
    pub enabled: bool,
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for WenwenaiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: String::new(),
            base_url: String::new(),
            model: "sora_video2".to_string(),
            timeout_secs: 300,
        }
    }
}

fn default_jwt_header() -> String {
    "Authorization".to_string()
}

fn default_jwt_prefix() -> String {
    "Bearer ".to_string()
}

fn default_wechat_base_url() -> String {
    "https://api.weixin.qq.com".to_string()
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        // 尝试读取配置文件，如果不存在则完全依赖环境变量
        let config_result = std::fs::read_to_string(&config_path);

        let mut config: Config = match config_result {
            Ok(config_str) => {
                // 有配置文件：先解析再用环境变量覆盖
                toml::from_str(&config_str).map_err(|e| format!("解析配置文件失败: {e}"))?
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                // 无配置文件：使用环境变量与默认值构建
                fn get_env(name: &str) -> Option<String> {
                    env::var(name).ok()
                }
                fn get_env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
                    env::var(name)
                        .ok()
                        .and_then(|v| v.parse::<T>().ok())
                        .unwrap_or(default)
                }

                // 数据库 URL 在无配置文件时必须提供
                let database_url = get_env("DATABASE_URL")
                    .ok_or("缺少 DATABASE_URL 环境变量，且未找到配置文件 config.toml")?;

                Config {
                    server: ServerConfig {
                        host: get_env("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                        port: get_env_parse("SERVER_PORT", 8080u16),
                    },
                    database: DatabaseConfig {
                        url: database_url,
                        max_connections: get_env_parse("DB_MAX_CONNECTIONS", 10u32),
                    },
                    jwt: JwtConfig {
                        secret: get_env("JWT_SECRET")
                            .unwrap_or_else(|| "change-me-in-production".to_string()),
                        expires_in: get_env_parse("JWT_EXPIRES_IN", 604_800i64),
                        header: default_jwt_header(),
                        prefix: default_jwt_prefix(),
                    },
                    wechat: WeChatConfig {
                        app_id: get_env("WECHAT_APP_ID").unwrap_or_default(),
                        app_secret: get_env("WECHAT_APP_SECRET").unwrap_or_default(),
                        base_url: get_env("WECHAT_BASE_URL")
                            .unwrap_or_else(default_wechat_base_url),
                    },
                    user: UserConfig {
                        register_bonus_credits: get_env_parse("USER_REGISTER_BONUS_CREDITS", 100),
                        sms_debug_echo: get_env_parse("USER_SMS_DEBUG_ECHO", false),
                    },
                    video: VideoConfig {
                        default_provider: get_env("VIDEO_DEFAULT_PROVIDER")
                            .unwrap_or_else(|| "sora-proxy".to_string()),
                        poll_interval_secs: get_env_parse("VIDEO_POLL_INTERVAL_SECS", 5u64),
                        max_poll_attempts: get_env_parse("VIDEO_MAX_POLL_ATTEMPTS", 60u32),
                        worker_count: get_env_parse("VIDEO_WORKER_COUNT", 4usize),
                        queue_capacity: get_env_parse("VIDEO_QUEUE_CAPACITY", 256usize),
                        refund_on_expired: get_env_parse("VIDEO_REFUND_ON_EXPIRED", true),
                        sora_proxy: SoraProxyConfig {
                            enabled: get_env_parse("SORA_PROXY_ENABLED", true),
                            api_key: get_env("SORA_PROXY_API_KEY").unwrap_or_default(),
                            base_url: get_env("SORA_PROXY_BASE_URL").unwrap_or_default(),
                            timeout_secs: get_env_parse("SORA_PROXY_TIMEOUT_SECS", 300u64),
                        },
                        wenwenai: WenwenaiConfig {
                            enabled: get_env_parse("WENWENAI_ENABLED", true),
                            api_key: get_env("WENWENAI_API_KEY").unwrap_or_default(),
                            base_url: get_env("WENWENAI_BASE_URL").unwrap_or_default(),
                            model: get_env("WENWENAI_MODEL")
                                .unwrap_or_else(|| "sora_video2".to_string()),
                            timeout_secs: get_env_parse("WENWENAI_TIMEOUT_SECS", 300u64),
                        },
                    },
                }
            }
            Err(e) => {
                return Err(format!("无法读取配置文件 {config_path}: {e}").into());
            }
        };

        // 环境变量覆盖（即便文件存在时也覆盖）
        if let Ok(v) = env::var("SERVER_HOST") {
            config.server.host = v;
        }
        if let Ok(v) = env::var("SERVER_PORT")
            && let Ok(p) = v.parse()
        {
            config.server.port = p;
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            config.database.url = v;
        }
        if let Ok(v) = env::var("DB_MAX_CONNECTIONS")
            && let Ok(mc) = v.parse()
        {
            config.database.max_connections = mc;
        }
        if let Ok(v) = env::var("JWT_SECRET") {
            config.jwt.secret = v;
        }
        if let Ok(v) = env::var("JWT_EXPIRES_IN")
            && let Ok(n) = v.parse()
        {
            config.jwt.expires_in = n;
        }
        if let Ok(v) = env::var("WECHAT_APP_ID") {
            config.wechat.app_id = v;
        }
        if let Ok(v) = env::var("WECHAT_APP_SECRET") {
            config.wechat.app_secret = v;
        }
        if let Ok(v) = env::var("WECHAT_BASE_URL") {
            config.wechat.base_url = v;
        }
        if let Ok(v) = env::var("USER_REGISTER_BONUS_CREDITS")
            && let Ok(n) = v.parse()
        {
            config.user.register_bonus_credits = n;
        }
        if let Ok(v) = env::var("VIDEO_DEFAULT_PROVIDER") {
            config.video.default_provider = v;
        }
        if let Ok(v) = env::var("VIDEO_WORKER_COUNT")
            && let Ok(n) = v.parse()
        {
            config.video.worker_count = n;
        }
        if let Ok(v) = env::var("VIDEO_REFUND_ON_EXPIRED")
            && let Ok(b) = v.parse()
        {
            config.video.refund_on_expired = b;
        }
        if let Ok(v) = env::var("SORA_PROXY_API_KEY") {
            config.video.sora_proxy.api_key = v;
        }
        if let Ok(v) = env::var("SORA_PROXY_BASE_URL") {
            config.video.sora_proxy.base_url = v;
        }
        if let Ok(v) = env::var("WENWENAI_API_KEY") {
            config.video.wenwenai.api_key = v;
        }
        if let Ok(v) = env::var("WENWENAI_BASE_URL") {
            config.video.wenwenai.base_url = v;
        }

        Ok(config)
    }
}
