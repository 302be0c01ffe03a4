use clap::Parser;
use std::path::PathBuf;

use crate::settings::Settings;

/// Two-hand gesture capture and classification server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Settings file (JSON). Missing file means built-in defaults.
    #[arg(long, value_name = "FILE", default_value = "signcapture.json")]
    pub config: PathBuf,

    /// Address to bind
    #[arg(long, value_name = "HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Directory holding the model graph, labels and info files
    #[arg(long, value_name = "DIR")]
    pub model_dir: Option<PathBuf>,

    /// Directory served at `/` for the browser client
    #[arg(long, value_name = "DIR")]
    pub static_dir: Option<PathBuf>,
}

impl Args {
    /// Command-line flags win over the settings file.
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(host) = &self.host {
            settings.server.host = host.clone();
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(dir) = &self.model_dir {
            settings.model.model_dir = dir.clone();
        }
        if let Some(dir) = &self.static_dir {
            settings.server.static_dir = Some(dir.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_settings() {
        let args = Args::parse_from(["signcapture", "--port", "9100", "--model-dir", "/srv/models"]);
        let mut settings = Settings::default();
        args.apply(&mut settings);

        assert_eq!(settings.server.port, 9100);
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.model.model_dir, PathBuf::from("/srv/models"));
        assert_eq!(args.config, PathBuf::from("signcapture.json"));
    }
}
