use std::path::PathBuf;

use anyhow::{Result, bail};

use gallery_storage::CloudinaryConfig;

/// Session secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub static_dir: PathBuf,
    pub session_secret: String,
    pub cloudinary: CloudinaryConfig,
}

impl Config {
    /// Read the deployment surface from the environment. Every secret
    /// is mandatory; a missing one refuses startup before the server
    /// ever binds.
    pub fn from_env() -> Result<Self> {
        let session_secret = required("GALLERY_SESSION_SECRET")?;
        if PLACEHOLDER_SECRETS.contains(&session_secret.as_str()) {
            bail!("GALLERY_SESSION_SECRET is still a placeholder; set a real secret");
        }

        let cloudinary = CloudinaryConfig {
            cloud_name: required("GALLERY_CLOUDINARY_CLOUD_NAME")?,
            api_key: required("GALLERY_CLOUDINARY_API_KEY")?,
            api_secret: required("GALLERY_CLOUDINARY_API_SECRET")?,
        };

        let port: u16 = std::env::var("GALLERY_PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()?;

        Ok(Self {
            host: std::env::var("GALLERY_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port,
            db_path: required("GALLERY_DB_PATH")?.into(),
            static_dir: std::env::var("GALLERY_STATIC_DIR")
                .unwrap_or_else(|_| "./public".into())
                .into(),
            session_secret,
            cloudinary,
        })
    }
}

fn required(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(v) if !v.is_empty() => Ok(v),
        _ => bail!("{} is unset; check your .env file", name),
    }
}
