use std::sync::Arc;

use anyhow::Result;
use chj_util::{warn, warn_thread};
use clap::Parser as ClapParser;
use markhtml::PoolConfig;
use markhtml_site::site::Site;
use rouille::{start_server, Request};

#[derive(clap::Parser, Debug)]
/// Serve the markhtml demo site.
struct Args {
    /// Address to listen on
    #[clap(long, default_value = "127.0.0.1:3000")]
    listen: String,

    /// How many responses and ending stacks to keep pooled (overrides
    /// MARKHTML_POOL_SIZE)
    #[clap(long)]
    pool_size: Option<usize>,

    /// Log each request
    #[clap(long)]
    trace: bool,

    /// Don't print warnings
    #[clap(long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    if let Some(n) = args.pool_size {
        // Before the pools are first touched
        std::env::set_var("MARKHTML_POOL_SIZE", n.to_string());
    }
    // Fail early on bad settings instead of falling back to defaults
    let config = PoolConfig::from_env()?;
    chj_util::warn::set_enabled(!args.quiet);
    chj_util::warn::set_thread_enabled(args.trace);

    let site = Arc::new(Site::new()?);
    warn!("listening on {}, {config:?}", args.listen);
    start_server(
        args.listen,
        move |request: &Request| {
            warn_thread!("{:?}: {} {}", request.remote_addr(), request.method(), request.raw_url());
            site.handle(request)
        });
}
