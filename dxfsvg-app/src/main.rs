use std::path::PathBuf;

use dxfsvg_config::{AppConfig, ConfigError, ConfigSource};
use dxfsvg_frontend::ConvertOptions;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

const USAGE: &str = "用法: dxfsvg-app [--config PATH] [--input drawing.json] [--output out.svg] [--id IDENT]";

fn main() {
    let mut args = std::env::args().skip(1);
    let mut config_override: Option<PathBuf> = None;
    let mut options = ConvertOptions::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => config_override = Some(PathBuf::from(required_value(&mut args, &arg))),
            "--input" => options.input = Some(PathBuf::from(required_value(&mut args, &arg))),
            "--output" => options.output = Some(PathBuf::from(required_value(&mut args, &arg))),
            "--id" => options.identifier = Some(required_value(&mut args, &arg)),
            "--help" | "-h" => {
                println!("{USAGE}");
                return;
            }
            other => {
                eprintln!("未知参数：{other}");
                eprintln!("{USAGE}");
                std::process::exit(1);
            }
        }
    }

    let (config, loaded) = load_configuration(config_override);
    init_logging(&config);
    info!("启动 dxfsvg 转换程序");
    // 日志初始化前无法输出，加载结果在此补记。
    match loaded {
        Ok(source) => info!(source = %source, "配置已加载"),
        Err(err) => warn!(error = %err, "加载配置失败，使用内建默认值"),
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            error!(error = %err, "无法创建异步运行时");
            std::process::exit(1);
        }
    };

    if let Err(err) = runtime.block_on(dxfsvg_frontend::run_cli(&config, &options)) {
        error!(error = %err, "SVG 转换失败");
        std::process::exit(1);
    }
}

fn required_value(args: &mut impl Iterator<Item = String>, flag: &str) -> String {
    match args.next() {
        Some(value) => value,
        None => {
            eprintln!("`{flag}` 需要提供参数值");
            std::process::exit(1);
        }
    }
}

/// 返回生效的配置，以及配置来源或加载失败的原因。
fn load_configuration(override_path: Option<PathBuf>) -> (AppConfig, Result<ConfigSource, ConfigError>) {
    let loaded = ConfigSource::resolve(override_path)
        .and_then(|source| AppConfig::load(&source).map(|config| (config, source)));
    match loaded {
        Ok((config, source)) => (config, Ok(source)),
        Err(err) => (AppConfig::default(), Err(err)),
    }
}

fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_new(config.logging.level.clone()).unwrap_or_else(|_| EnvFilter::new("info"));
    // 日志写到 stderr，stdout 留给 SVG 输出。
    if fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .is_err()
    {
        eprintln!("日志订阅器已存在，沿用现有设置");
    }
}
