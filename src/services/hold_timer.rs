//! Отменяемый таймер удержания мест с единственным колбэком истечения.
//!
//! Работает на `tokio::time`, поэтому в тестах время можно заморозить
//! (`start_paused`) и проматывать без реального ожидания.

use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

pub struct HoldTimer {
    deadline: Instant,
    cancel_tx: Option<oneshot::Sender<()>>,
    handle: JoinHandle<bool>,
}

impl HoldTimer {
    /// Запускает таймер. `on_expire` вызывается не более одного раза
    /// и никогда после [`HoldTimer::cancel`].
    pub fn start<F>(window: Duration, on_expire: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let deadline = Instant::now() + window;
        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = cancel_rx => {
                    debug!("Hold timer cancelled");
                    false
                }
                _ = tokio::time::sleep_until(deadline) => {
                    debug!("Hold timer expired");
                    on_expire();
                    true
                }
            }
        });

        Self {
            deadline,
            cancel_tx: Some(cancel_tx),
            handle,
        }
    }

    /// Сколько осталось до истечения (ноль, если уже истёк).
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        self.remaining().is_zero()
    }

    /// Останавливает таймер. Возвращает `true`, если колбэк к этому моменту
    /// ещё не сработал.
    pub async fn cancel(mut self) -> bool {
        if let Some(tx) = self.cancel_tx.take() {
            let _ = tx.send(());
        }
        match (&mut self.handle).await {
            Ok(fired) => !fired,
            Err(_) => true,
        }
    }
}

impl Drop for HoldTimer {
    fn drop(&mut self) {
        if let Some(tx) = self.cancel_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// "04:59"
pub fn format_remaining(remaining: Duration) -> String {
    let secs = remaining.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn counter() -> (Arc<AtomicU32>, impl FnOnce() + Send + 'static) {
        let fired = Arc::new(AtomicU32::new(0));
        let f = fired.clone();
        (fired, move || {
            f.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test(start_paused = true)]
    async fn fires_once_after_window() {
        let (fired, cb) = counter();
        let timer = HoldTimer::start(Duration::from_secs(300), cb);

        tokio::time::sleep(Duration::from_secs(299)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(timer.remaining(), Duration::from_secs(1));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(timer.is_expired());
        assert!(!timer.cancel().await);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_prevents_callback() {
        let (fired, cb) = counter();
        let timer = HoldTimer::start(Duration::from_secs(180), cb);
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(timer.cancel().await);

        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn drop_cancels() {
        let (fired, cb) = counter();
        drop(HoldTimer::start(Duration::from_secs(5), cb));
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn formats_minutes_and_seconds() {
        assert_eq!(format_remaining(Duration::from_secs(300)), "05:00");
        assert_eq!(format_remaining(Duration::from_secs(59)), "00:59");
        assert_eq!(format_remaining(Duration::from_millis(61_900)), "01:01");
    }
}
