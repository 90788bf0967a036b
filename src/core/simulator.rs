use std::ops::Range;
use std::time::Duration;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time::{interval_at, sleep_until, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use super::errors::{Result, UploadError};

/// 交互式槽位注入失败时上报的错误信息
pub(crate) const INTERACTIVE_FAILURE_MESSAGE: &str = "Upload failed. Please try again.";
/// 服务端模拟注入失败时上报的错误信息
pub(crate) const SERVICE_FAILURE_MESSAGE: &str = "Upload failed due to network error";

/// 模拟进度配置
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// 进度 tick 间隔
    pub tick_interval: Duration,
    /// 每次 tick 的进度增量上限（不含）
    pub max_step: f64,
    /// 注入失败的概率
    pub failure_chance: f64,
    /// 失败窗口：启动后在该区间内随机选一个触发时刻
    pub failure_window: Range<Duration>,
    /// 注入失败时上报的错误信息
    pub failure_message: String,
}

impl SimulatorConfig {
    /// 交互式槽位的配置（10% 失败率，1-3 秒窗口）
    pub fn interactive() -> Self {
        Self {
            tick_interval: Duration::from_millis(200),
            max_step: 15.0,
            failure_chance: 0.10,
            failure_window: Duration::from_secs(1)..Duration::from_secs(3),
            failure_message: INTERACTIVE_FAILURE_MESSAGE.to_string(),
        }
    }

    /// 服务端模拟的配置（5% 失败率，1-4 秒窗口）
    ///
    /// 两个调用点的概率、窗口和错误信息刻意不同，不要合并
    pub fn service() -> Self {
        Self {
            failure_chance: 0.05,
            failure_window: Duration::from_secs(1)..Duration::from_secs(4),
            failure_message: SERVICE_FAILURE_MESSAGE.to_string(),
            ..Self::interactive()
        }
    }
}

/// 模拟上传：周期性进度增量与随机失败窗口竞争，先到先决
///
/// 每次 run 只产生一个结果；取消后不再有任何输出
pub struct ProgressSimulator {
    config: SimulatorConfig,
    cancellation_token: CancellationToken,
}

impl ProgressSimulator {
    pub fn new(config: SimulatorConfig) -> Self {
        Self {
            config,
            cancellation_token: CancellationToken::new(),
        }
    }

    pub fn with_cancellation_token(config: SimulatorConfig, cancellation_token: CancellationToken) -> Self {
        Self {
            config,
            cancellation_token,
        }
    }

    /// 运行直到完成、失败或被取消
    ///
    /// 中间进度不会上报 100；完成即隐含 100
    pub async fn run<F>(self, mut on_progress: F) -> Result<()>
    where
        F: FnMut(u8),
    {
        let mut rng = StdRng::from_entropy();

        // 启动时决定本次是否注入失败，以及窗口内的触发时刻
        let armed = rng.gen_bool(self.config.failure_chance);
        let failure_timer = sleep_until(Instant::now() + self.failure_delay(&mut rng));
        tokio::pin!(failure_timer);

        let mut ticker = interval_at(
            Instant::now() + self.config.tick_interval,
            self.config.tick_interval,
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut progress = 0.0f64;

        loop {
            tokio::select! {
                _ = self.cancellation_token.cancelled() => {
                    return Err(UploadError::Cancelled);
                }
                _ = &mut failure_timer, if armed => {
                    // 先完成则循环已经退出，窗口定时器自然失效
                    return Err(UploadError::Transfer(self.config.failure_message.clone()));
                }
                _ = ticker.tick() => {
                    progress += rng.gen_range(0.0..self.config.max_step);
                    if progress >= 100.0 {
                        return Ok(());
                    }
                    on_progress((progress.round() as u8).min(99));
                }
            }
        }
    }

    fn failure_delay(&self, rng: &mut StdRng) -> Duration {
        let window = &self.config.failure_window;
        let span = window.end.saturating_sub(window.start);
        if span.is_zero() {
            return window.start;
        }
        window.start + Duration::from_millis(rng.gen_range(0..span.as_millis() as u64))
    }
}
