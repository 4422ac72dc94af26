mod api;
mod app;
mod cache;
mod client;
mod config;
mod event;
mod logging;
mod messages;
mod pagination;
mod session;
mod ui;
mod validation;

use api::types::ActivateRequest;
use app::{App, StartView};
use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "exdash")]
#[command(about = "A terminal client for the example data dashboard")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/exdash/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Server base URL, overrides the config file and EXDASH_API_URL
  #[arg(long)]
  api_url: Option<String>,

  /// Directory for log files (default: $XDG_DATA_HOME/exdash/logs)
  #[arg(long)]
  log_dir: Option<PathBuf>,

  /// Activate an account with the id and token from the activation email
  #[arg(long, num_args = 2, value_names = ["ID", "TOKEN"])]
  activate: Option<Vec<String>>,

  /// Open the change-password form with the token from the reset email
  #[arg(long, value_name = "TOKEN", conflicts_with = "activate")]
  reset_token: Option<String>,
}

impl Args {
  fn start_view(&self) -> StartView {
    if let Some([id, token]) = self.activate.as_deref() {
      return StartView::Activate(ActivateRequest {
        id: id.clone(),
        token: token.clone(),
      });
    }
    match &self.reset_token {
      Some(token) => StartView::ChangePassword {
        token: token.clone(),
      },
      None => StartView::Dashboard,
    }
  }
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let mut config = config::Config::load(args.config.as_deref())?;
  if let Some(url) = &args.api_url {
    config.api.url = url.clone();
  }

  let log_dir = match &args.log_dir {
    Some(dir) => dir.clone(),
    None => logging::default_log_dir()?,
  };
  let _guard = logging::init(&log_dir, config.log_level)?;
  info!(version = env!("CARGO_PKG_VERSION"), "starting");

  let api = client::Api::connect(&config)?;
  let mut app = App::new(api, config.api.url.clone(), args.start_view());
  app.run().await?;

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_start_view_from_args() {
    let args = Args::parse_from(["exdash", "--activate", "MQ", "abc-123"]);
    assert_eq!(
      args.start_view(),
      StartView::Activate(ActivateRequest {
        id: "MQ".to_string(),
        token: "abc-123".to_string(),
      })
    );

    let args = Args::parse_from(["exdash", "--reset-token", "tok"]);
    assert_eq!(
      args.start_view(),
      StartView::ChangePassword {
        token: "tok".to_string()
      }
    );

    assert_eq!(Args::parse_from(["exdash"]).start_view(), StartView::Dashboard);
  }

  #[test]
  fn test_activate_needs_both_values() {
    assert!(Args::try_parse_from(["exdash", "--activate", "MQ"]).is_err());
  }
}
