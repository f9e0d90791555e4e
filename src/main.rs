use async_std::task;
use clap::Parser;
use log::{error, info, warn};

use scgi_fixture::cli::{self, Args, Command};
use scgi_fixture::error::FixtureResult;
use scgi_fixture::net::server::Server;
use scgi_fixture::scgi::response::ParsedResponse;

fn init_logging() {
    env_logger::builder()
        .format_module_path(true)
        .format_timestamp(None)
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}

fn main() -> FixtureResult<()> {
    init_logging();

    let result = match Args::parse().command.unwrap_or_default() {
        Command::Serve(serve) => task::block_on(async {
            let server = Server::bind(serve.resolve_config()).await?;
            server.run().await
        }),
        Command::Probe(probe) => {
            let bytes = task::block_on(cli::probe(&probe))?;
            info!("Received {} bytes", bytes.len());
            match ParsedResponse::from_bytes(&bytes) {
                Ok(res) => {
                    println!("status: {}", res.code);
                    println!("meta:   {}", res.meta);
                    println!("body:   {:?}", String::from_utf8_lossy(&res.body));
                }
                Err(err) => {
                    warn!("Not a valid response: {err}");
                    println!("raw:    {:?}", String::from_utf8_lossy(&bytes));
                }
            }
            Ok(())
        }
    };
    result.inspect_err(|err| error!("{err}"))
}
