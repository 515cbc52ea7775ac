use std::path::PathBuf;

use super::parsing::{
    env_flag, env_number, env_optional, env_or_default, is_supported_image_extension,
    parse_cors_origins, parse_environment, parse_string_list,
};
use super::secret::load_or_create_secret_key;
use super::types::{
    AccountSettings, AdminSettings, ApiSettings, ConfigError, CorsSettings, DatabaseSettings,
    ImportSettings, RedisSettings, RuntimeSettings, S3Settings, SecuritySettings, ServerHost,
    ServerPort, ServerSettings, Settings, StorageSettings, TelemetrySettings,
};

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let host = env_or_default("EXAMHALL_HOST", "0.0.0.0");
        let port = env_or_default("EXAMHALL_PORT", "8000");

        let environment = parse_environment(
            env_optional("EXAMHALL_ENV").or_else(|| env_optional("ENVIRONMENT")),
        );
        let strict_config = env_flag("EXAMHALL_STRICT_CONFIG") || environment.is_production();

        let project_name = env_or_default("PROJECT_NAME", "Examhall API");
        let version = env_or_default("VERSION", env!("CARGO_PKG_VERSION"));
        let api_v1_str = env_or_default("API_V1_STR", "/api/v1");

        let secret_key = match env_optional("SECRET_KEY") {
            Some(value) => value,
            None => load_or_create_secret_key(),
        };

        let access_token_expire_minutes = env_number("ACCESS_TOKEN_EXPIRE_MINUTES", 720_u64)?;
        let algorithm = env_or_default("ALGORITHM", "HS256");

        let cors_origins = parse_cors_origins(env_optional("BACKEND_CORS_ORIGINS"))?;

        let postgres_server = env_or_default("POSTGRES_SERVER", "localhost");
        let postgres_port = env_number("POSTGRES_PORT", 5432_u16)?;
        let postgres_user = env_or_default("POSTGRES_USER", "examhall");
        let postgres_password = env_or_default("POSTGRES_PASSWORD", "");
        let postgres_db = env_or_default("POSTGRES_DB", "examhall_db");
        let database_url = env_optional("DATABASE_URL");
        let db_max_connections = env_number("DATABASE_MAX_CONNECTIONS", 20_u16)?;

        let redis_host = env_or_default("REDIS_HOST", "localhost");
        let redis_port = env_number("REDIS_PORT", 6379_u16)?;
        let redis_db = env_number("REDIS_DB", 0_u16)?;
        let redis_password = env_or_default("REDIS_PASSWORD", "");

        let uploads_dir = env_or_default("UPLOADS_DIR", "uploads");
        let allowed_image_extensions = parse_string_list(
            env_optional("ALLOWED_IMAGE_EXTENSIONS"),
            &["jpg", "jpeg", "png", "gif", "webp"],
        );

        let s3_endpoint = env_or_default("S3_ENDPOINT", "https://storage.yandexcloud.net");
        let s3_access_key = env_or_default("S3_ACCESS_KEY", "");
        let s3_secret_key = env_or_default("S3_SECRET_KEY", "");
        let s3_bucket = env_or_default("S3_BUCKET", "examhall-assets");
        let s3_region = env_or_default("S3_REGION", "ru-central1");
        let s3_public_base_url = env_or_default("S3_PUBLIC_BASE_URL", "");

        let max_import_upload_mb = env_number("MAX_IMPORT_UPLOAD_MB", 50_u64)?;
        let import_max_uncompressed_mb = env_number("IMPORT_MAX_UNCOMPRESSED_MB", 200_u64)?;
        let manifest_name = env_or_default("IMPORT_MANIFEST_NAME", "manifest.csv");
        let import_work_dir = env_optional("IMPORT_WORK_DIR").map(PathBuf::from);

        let student_password_suffix = env_or_default("STUDENT_PASSWORD_SUFFIX", "@Exam");

        let first_coordinator_username = env_or_default("FIRST_COORDINATOR_USERNAME", "coordinator");
        let first_coordinator_password = env_or_default("FIRST_COORDINATOR_PASSWORD", "");

        let log_level = env_or_default("EXAMHALL_LOG_LEVEL", "info");
        let json = env_flag("EXAMHALL_LOG_JSON");
        let prometheus_enabled = env_flag("PROMETHEUS_ENABLED");

        let settings = Self {
            server: ServerSettings {
                host: ServerHost::parse(host)?,
                port: ServerPort::parse(port)?,
            },
            runtime: RuntimeSettings { environment, strict_config },
            api: ApiSettings { project_name, version, api_v1_str },
            security: SecuritySettings { secret_key, access_token_expire_minutes, algorithm },
            cors: CorsSettings { origins: cors_origins },
            database: DatabaseSettings {
                postgres_server,
                postgres_port,
                postgres_user,
                postgres_password,
                postgres_db,
                database_url,
                max_connections: db_max_connections,
            },
            redis: RedisSettings {
                host: redis_host,
                port: redis_port,
                db: redis_db,
                password: redis_password,
            },
            storage: StorageSettings { uploads_dir, allowed_image_extensions },
            s3: S3Settings {
                endpoint: s3_endpoint,
                access_key: s3_access_key,
                secret_key: s3_secret_key,
                bucket: s3_bucket,
                region: s3_region,
                public_base_url: s3_public_base_url,
            },
            import: ImportSettings {
                max_upload_size_mb: max_import_upload_mb,
                max_uncompressed_mb: import_max_uncompressed_mb,
                manifest_name,
                work_dir: import_work_dir,
            },
            accounts: AccountSettings { student_password_suffix },
            admin: AdminSettings { first_coordinator_username, first_coordinator_password },
            telemetry: TelemetrySettings { log_level, json, prometheus_enabled },
        };

        settings.validate()?;
        Ok(settings)
    }

    pub(crate) fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host.0, self.server.port.0)
    }

    pub(crate) fn server_host(&self) -> &str {
        &self.server.host.0
    }

    pub(crate) fn server_port(&self) -> u16 {
        self.server.port.0
    }

    pub(crate) fn api(&self) -> &ApiSettings {
        &self.api
    }

    pub(crate) fn security(&self) -> &SecuritySettings {
        &self.security
    }

    pub(crate) fn cors(&self) -> &CorsSettings {
        &self.cors
    }

    pub(crate) fn database(&self) -> &DatabaseSettings {
        &self.database
    }

    pub(crate) fn redis(&self) -> &RedisSettings {
        &self.redis
    }

    pub(crate) fn storage(&self) -> &StorageSettings {
        &self.storage
    }

    pub(crate) fn s3(&self) -> &S3Settings {
        &self.s3
    }

    pub(crate) fn import(&self) -> &ImportSettings {
        &self.import
    }

    pub(crate) fn accounts(&self) -> &AccountSettings {
        &self.accounts
    }

    pub(crate) fn admin(&self) -> &AdminSettings {
        &self.admin
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.allowed_image_extensions.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "ALLOWED_IMAGE_EXTENSIONS",
                value: String::from("<empty>"),
            });
        }

        for extension in &self.storage.allowed_image_extensions {
            if !is_supported_image_extension(extension) {
                return Err(ConfigError::InvalidValue {
                    field: "ALLOWED_IMAGE_EXTENSIONS",
                    value: extension.clone(),
                });
            }
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::InvalidValue {
                field: "DATABASE_MAX_CONNECTIONS",
                value: "0".to_string(),
            });
        }

        if self.import.max_upload_size_mb == 0 {
            return Err(ConfigError::InvalidValue {
                field: "MAX_IMPORT_UPLOAD_MB",
                value: "0".to_string(),
            });
        }

        if self.import.max_uncompressed_mb < self.import.max_upload_size_mb {
            return Err(ConfigError::InvalidValue {
                field: "IMPORT_MAX_UNCOMPRESSED_MB",
                value: self.import.max_uncompressed_mb.to_string(),
            });
        }

        if self.import.manifest_name.contains('/') || self.import.manifest_name.contains('\\') {
            return Err(ConfigError::InvalidValue {
                field: "IMPORT_MANIFEST_NAME",
                value: self.import.manifest_name.clone(),
            });
        }

        if !(self.runtime.strict_config || self.runtime.environment.is_production()) {
            return Ok(());
        }

        if self.database.database_url.is_none() && self.database.postgres_password.is_empty() {
            return Err(ConfigError::MissingSecret("POSTGRES_PASSWORD"));
        }
        if self.admin.first_coordinator_password.is_empty() {
            return Err(ConfigError::MissingSecret("FIRST_COORDINATOR_PASSWORD"));
        }

        Ok(())
    }
}
