use crate::demo::{run_demo, run_recommend, DemoArgs, RecommendArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use wardrobe_ai::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Wardrobe Outfit Recommender",
    about = "Run and exercise the outfit recommendation service from the command line",
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
    /// Compose a single outfit against the configured stores and print it as JSON
    Recommend(RecommendArgs),
    /// Seed an in-memory wardrobe, rate an outfit and show the effect on the next one
    Demo(DemoArgs),
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

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Recommend(args) => run_recommend(args).await,
        Command::Demo(args) => run_demo(args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["wardrobe-ai-api"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn recommend_accepts_filters_and_keywords() {
        let cli = Cli::try_parse_from([
            "wardrobe-ai-api",
            "recommend",
            "party",
            "--color",
            "red",
            "--keywords",
            "sparkly, bold",
        ])
        .expect("parses");

        match cli.command {
            Some(Command::Recommend(args)) => {
                let request = args.into_request();
                assert_eq!(request.occasion, "party");
                assert_eq!(request.color.as_deref(), Some("red"));
                assert_eq!(request.keywords, vec!["sparkly", "bold"]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
