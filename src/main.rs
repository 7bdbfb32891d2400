//! XJP Vercel Monitor - Vercel 项目监控代理
//!
//! Usage:
//! - Normal mode: `xjp-vercel-monitor`
//! - With custom port: `xjp-vercel-monitor --port 9881`

use xjp_vercel_monitor::RuntimeConfig;

/// 解析命令行参数
fn parse_args() -> RuntimeConfig {
    let args: Vec<String> = std::env::args().collect();
    let mut config = RuntimeConfig::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--port" if i + 1 < args.len() => {
                config.port_override = args[i + 1].parse().ok();
                i += 2;
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            _ => {
                i += 1;
            }
        }
    }

    config
}

fn print_help() {
    println!("XJP Vercel Monitor - Vercel 项目监控代理");
    println!();
    println!("USAGE:");
    println!("    xjp-vercel-monitor [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    --port <PORT>    Override the listening port");
    println!("    -h, --help       Print help information");
    println!();
    println!("ENVIRONMENT:");
    println!("    VERCEL_TOKEN                     Vercel API credential");
    println!("    VERCEL_TEAM_ID                   Optional team scope");
    println!("    VERCEL_MONITOR_API_KEY           Consumer API key (falls back to API_KEY)");
    println!("    PROJECT_SCAN_INTERVAL_SECS       Resource refresh interval (default 900)");
    println!("    DEPLOYMENT_SCAN_INTERVAL_SECS    Deployment refresh interval (default 60)");
    println!("    DEPLOYMENT_WINDOW                Deployments kept per project (default 5)");
}

fn main() {
    let config = parse_args();

    let rt = tokio::runtime::Runtime::new().expect("Failed to create runtime");
    rt.block_on(async {
        xjp_vercel_monitor::init_and_run(config).await;
    });
}
