use std::process::ExitCode;

use clap::Parser;

use say_hi_relay::client::SayHiClient;

#[derive(Parser)]
#[command(name = "say-hi-cli")]
#[command(about = "Send a name through a say-hi relay", long_about = None)]
struct Cli {
    /// Relay API endpoint.
    #[arg(short, long, default_value = "http://127.0.0.1:8080/api")]
    url: String,

    /// Name to greet: letters, up to three words, max 30 characters.
    name: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match SayHiClient::new(cli.url) {
        Ok(client) => client.say_hi(&cli.name).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(greeting) => {
            if let Some(message) = &greeting.message {
                println!("{message}");
            }
            if let Some(error) = &greeting.error {
                eprintln!("Error: {error}");
            }
            if greeting.is_success() {
                ExitCode::SUCCESS
            } else {
                eprintln!("Relay returned status {}", greeting.status);
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
