//! 日志初始化
//!
//! 模拟核心只通过 `log` 宏输出，宿主决定是否以及如何安装日志后端。

use env_logger::{Builder, Env};
use log::LevelFilter;

/// 安装全局 env_logger
///
/// `verbose` 为真时输出 debug 及以上级别，否则只输出 info 及以上。
/// `RUST_LOG` 环境变量优先于这里的默认值。
pub fn init(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let mut builder = Builder::from_env(Env::default().default_filter_or(level.to_string()));
    builder.format_timestamp_millis();

    // 已经安装过日志后端时 try_init 失败，忽略即可
    let _ = builder.try_init();
}

/// 测试用日志：输出交给测试框架捕获，重复调用无副作用
pub fn init_for_tests() {
    let _ = Builder::from_env(Env::default().default_filter_or("debug"))
        .is_test(true)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_init_is_harmless() {
        init_for_tests();
        init(true);
        init(false);
        log::debug!("logger installed");
    }
}
