use crate::server;
use clap::{Args, Parser, Subcommand};
use engagement_qualifier::error::AppError;
use engagement_qualifier::workflows::qualification::{ScoreEngine, ScoreInput, ScoreResult};

#[derive(Parser, Debug)]
#[command(
    name = "Qualification.ai",
    about = "Score, qualify and query reactive engagement requests",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Compute the weighted qualification score for a set of metrics
    Score(ScoreArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// Projected Azure consumed revenue in USD
    #[arg(long)]
    pub(crate) projected_acr: f64,
    /// Projected engagement length in hours
    #[arg(long)]
    pub(crate) projected_length: f64,
    /// 1 when partner executives are involved, 0 otherwise
    #[arg(long, default_value_t = 0.0)]
    pub(crate) partner_executives: f64,
    /// Current monthly Azure consumed revenue in USD
    #[arg(long)]
    pub(crate) actual_acr: f64,
    /// Print the breakdown as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

impl From<&ScoreArgs> for ScoreInput {
    fn from(args: &ScoreArgs) -> Self {
        ScoreInput {
            projected_acr: args.projected_acr,
            projected_length: args.projected_length,
            partner_executives: args.partner_executives,
            actual_acr: args.actual_acr,
        }
    }
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Score(args) => {
            run_score(&args);
            Ok(())
        }
    }
}

fn run_score(args: &ScoreArgs) {
    let result = ScoreEngine.compute(ScoreInput::from(args));
    if args.json {
        match serde_json::to_string_pretty(&result) {
            Ok(rendered) => println!("{rendered}"),
            Err(err) => eprintln!("failed to render score: {err}"),
        }
    } else {
        print!("{}", render_score(&result));
    }
}

pub(crate) fn render_score(result: &ScoreResult) -> String {
    let mut out = String::new();
    out.push_str(&format!("Total score:          {:.4}\n", result.total_score));
    out.push_str(&format!(
        "  Projected ACR:      {:.4}\n",
        result.weighted_projected_acr
    ));
    out.push_str(&format!(
        "  Projected length:   {:.4}\n",
        result.weighted_projected_length
    ));
    out.push_str(&format!(
        "  Partner executives: {:.4}\n",
        result.weighted_partner_executives
    ));
    out.push_str(&format!(
        "  Actual ACR:         {:.4}\n",
        result.weighted_actual_acr
    ));
    for adjustment in &result.adjustments {
        out.push_str(&format!(
            "note: {} {} clamped to {}\n",
            adjustment.field.label(),
            adjustment.submitted,
            adjustment.clamped
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_subcommand_parses_metrics() {
        let cli = Cli::parse_from([
            "qualification",
            "score",
            "--projected-acr",
            "60000",
            "--projected-length",
            "70",
            "--partner-executives",
            "1",
            "--actual-acr",
            "150000",
        ]);

        match cli.command {
            Some(Command::Score(args)) => {
                let input = ScoreInput::from(&args);
                assert_eq!(input.projected_acr, 60_000.0);
                assert_eq!(input.partner_executives, 1.0);
                assert!(!args.json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::parse_from(["qualification"]);
        assert!(cli.command.is_none());

        let cli = Cli::parse_from(["qualification", "serve", "--port", "8080"]);
        match cli.command {
            Some(Command::Serve(args)) => assert_eq!(args.port, Some(8080)),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rendered_score_lists_clamped_inputs() {
        let result = ScoreEngine.compute(ScoreInput {
            projected_acr: 90_000.0,
            projected_length: 70.0,
            partner_executives: 1.0,
            actual_acr: 150_000.0,
        });

        let rendered = render_score(&result);
        assert!(rendered.starts_with("Total score:          1.0000"));
        assert!(rendered.contains("note: Projected ACR 90000 clamped to 50000"));
    }
}
