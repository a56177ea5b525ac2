//! Demo Service - 演示服务入口
//!
//! 使用 foundation-bootstrap 统一启动模式

mod greeter;

use std::sync::Arc;
use std::time::Duration;

use foundation_bootstrap::App;
use foundation_config::AppConfig;
use foundation_errors::AppError;

use greeter::{GreeterService, SAY_HELLO_PATH, say_hello_handler};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // 加载配置
    let config = AppConfig::load("config")?;

    let mut app = App::new(config);
    app.init()?;

    let broker = app
        .broker()
        .ok_or_else(|| AppError::internal("broker is not initialized"))?;
    let rpc = app
        .rpc_server()
        .ok_or_else(|| AppError::internal("rpc server is not initialized"))?;

    // 处理函数需在启动前注册
    rpc.register_handler(SAY_HELLO_PATH, say_hello_handler())?;
    app.register(Arc::new(GreeterService::new(
        broker,
        Duration::from_secs(5),
    )))?;

    app.run().await?;

    Ok(())
}
