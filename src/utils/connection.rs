use url::Url;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 27017;

/// Connection details decomposed from a database URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub database: String,
    pub raw_uri: String,
}

impl ConnectionDescriptor {
    /// `user:***@host:port/database`, safe to log.
    pub fn redacted(&self) -> String {
        let credentials = match (&self.username, &self.password) {
            (Some(user), Some(_)) => format!("{}:***@", user),
            (Some(user), None) => format!("{}@", user),
            _ => String::new(),
        };
        format!("{}{}:{}/{}", credentials, self.host, self.port, self.database)
    }
}

/// Best-effort parse of a MongoDB connection string. Never fails: anything the
/// URL parser rejects (multi-host seed lists, garbage) yields the defaults.
pub fn parse_uri(raw: &str, default_database: &str) -> ConnectionDescriptor {
    let fallback = || ConnectionDescriptor {
        host: DEFAULT_HOST.to_string(),
        port: DEFAULT_PORT,
        username: None,
        password: None,
        database: default_database.to_string(),
        raw_uri: raw.to_string(),
    };

    let Ok(parsed) = Url::parse(raw) else {
        return fallback();
    };

    let database = parsed.path().trim_start_matches('/');
    ConnectionDescriptor {
        host: parsed
            .host_str()
            .filter(|h| !h.is_empty())
            .unwrap_or(DEFAULT_HOST)
            .to_string(),
        port: parsed.port().unwrap_or(DEFAULT_PORT),
        username: Some(parsed.username()).filter(|u| !u.is_empty()).map(str::to_string),
        password: parsed.password().filter(|p| !p.is_empty()).map(str::to_string),
        database: if database.is_empty() {
            default_database.to_string()
        } else {
            database.to_string()
        },
        raw_uri: raw.to_string(),
    }
}
