mod cli;
mod infra;
mod routes;
mod server;

use engagement_qualifier::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
