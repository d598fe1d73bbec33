use anyhow::Result;
use coast_subform_upload::infrastructure::restore_terminal;
use coast_subform_upload::utils::logging::init_log_file;
use coast_subform_upload::{logger, App, Config};
use tracing::{error, info};

/// 被 SIGINT 中断时的退出码
const INTERRUPTED_EXIT_CODE: i32 = 130;

#[tokio::main]
async fn main() -> Result<()> {
    // 读取 .env（可选）
    dotenvy::dotenv().ok();

    // 加载配置
    let config = Config::load()?;

    // 初始化日志
    init_log_file(&config.output_log_file)?;
    logger::init(&config.output_log_file)?;

    // 初始化并运行应用
    let mut app = App::initialize(config).await?;

    let (result, interrupted) = tokio::select! {
        result = app.run() => (result, false),
        _ = tokio::signal::ctrl_c() => {
            info!("\n\n收到中断信号，正在退出...");
            (Ok(()), true)
        }
    };

    if let Err(e) = &result {
        error!("❌ 程序异常退出: {:#}", e);
    }
    app.shutdown().await;

    if interrupted {
        // 阻塞在标准输入上的读取任务不会随运行时结束，只能直接退出进程
        restore_terminal();
        std::process::exit(INTERRUPTED_EXIT_CODE);
    }

    result
}
