use casino_tui::client;
use color_eyre::eyre::{
    Result,
    eyre,
};

fn print_usage_and_exit() -> ! {
    println!(
        "Usage: casino-tui [--server-url <url>] [--log]\n\
         \n\
         Flags:\n\
           --server-url <url>  Casino backend to play against (default {})\n\
           --log               Write logs to ./casino-tui.log (RUST_LOG sets the level)",
        client::DEFAULT_SERVER_URL,
    );
    std::process::exit(0);
}

fn parse_cli_args() -> Result<client::AppConfig> {
    let mut args = std::env::args().skip(1);
    let mut server_url: Option<String> = None;
    let mut log_to_file = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--server-url" => {
                let url = args
                    .next()
                    .ok_or_else(|| eyre!("--server-url requires a URL argument"))?;
                if server_url.is_some() {
                    return Err(eyre!("--server-url may only be specified once"));
                }
                server_url = Some(url);
            }
            "--log" => log_to_file = true,
            "--help" | "-h" => print_usage_and_exit(),
            other => return Err(eyre!("Unknown argument: {other}")),
        }
    }

    Ok(client::AppConfig {
        server_url: server_url.unwrap_or_else(|| client::DEFAULT_SERVER_URL.to_string()),
        log_to_file,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let app_config = parse_cli_args()?;
    let _log_guard = client::init_tracing(&app_config);
    tracing::info!("starting casino client");
    client::run_app(app_config).await
}
