use std::process::ExitCode;

use anyhow::Context;
use mathsage::{
    cli::{args_from_env, load_transcript},
    config::Config,
    logging::init_tracing,
    tutor::Tutor,
};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = args_from_env()?;
    let config = Config::load(&args.config_path)
        .with_context(|| format!("failed to load config from {}", args.config_path.display()))?;
    let logging = init_tracing(&config.logging)?;

    let transcript = load_transcript(&args.transcript_path)?;
    let tutor = Tutor::from_config(&config).context("failed to build the AI gateway")?;

    let cancel = CancellationToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!(target: "tutor", "ctrl_c_received");
            ctrl_c_cancel.cancel();
        }
    });

    match tutor
        .respond(&transcript, args.problem.as_deref(), &cancel)
        .instrument(logging.invocation_span())
        .await
    {
        Ok(reply) => {
            let rendered =
                serde_json::to_string_pretty(&reply).context("failed to render tutor reply")?;
            println!("{rendered}");
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            tracing::error!(
                target: "tutor",
                kind = ?err.kind,
                stage = err.stage.as_str(),
                error = %err,
                "tutor_reply_failed"
            );
            eprintln!("{}", err.user_message());
            Ok(ExitCode::FAILURE)
        }
    }
}
