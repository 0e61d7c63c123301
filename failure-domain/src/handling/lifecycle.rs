//! 服务生命周期（ServiceState）
//!
//! `New → Starting → Running → Stopping → Terminated`，
//! 以及任意非终态在启动/关闭出现不可恢复错误时进入的 `Failed`。
//! 状态存放在 `watch` 通道中，便于等待特定状态。
//!
use crate::error::{FailureError, FailureResult};
use std::fmt;
use tokio::sync::watch;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ServiceState {
    New,
    Starting,
    Running,
    Stopping,
    Terminated,
    Failed,
}

impl ServiceState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ServiceState::Terminated | ServiceState::Failed)
    }

    pub fn can_transition_to(self, next: ServiceState) -> bool {
        use ServiceState::*;

        match (self, next) {
            (New, Starting)
            | (Starting, Running)
            | (Starting, Stopping)
            | (Running, Stopping)
            | (Stopping, Terminated) => true,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ServiceState::New => "NEW",
            ServiceState::Starting => "STARTING",
            ServiceState::Running => "RUNNING",
            ServiceState::Stopping => "STOPPING",
            ServiceState::Terminated => "TERMINATED",
            ServiceState::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// 可观察的状态单元：只允许合法迁移
#[derive(Debug)]
pub(crate) struct StateCell {
    tx: watch::Sender<ServiceState>,
}

impl Default for StateCell {
    fn default() -> Self {
        let (tx, _rx) = watch::channel(ServiceState::New);
        Self { tx }
    }
}

impl StateCell {
    pub(crate) fn get(&self) -> ServiceState {
        *self.tx.borrow()
    }

    /// 迁移到 `next`，成功时返回迁移前的状态
    pub(crate) fn transition(&self, next: ServiceState) -> FailureResult<ServiceState> {
        let mut outcome = Err(FailureError::IllegalTransition {
            from: ServiceState::New,
            to: next,
        });

        self.tx.send_if_modified(|current| {
            if current.can_transition_to(next) {
                outcome = Ok(*current);
                *current = next;
                true
            } else {
                outcome = Err(FailureError::IllegalTransition {
                    from: *current,
                    to: next,
                });
                false
            }
        });

        outcome
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<ServiceState> {
        self.tx.subscribe()
    }

    /// 等待满足条件的状态并返回它
    pub(crate) async fn wait_until(
        &self,
        mut accept: impl FnMut(ServiceState) -> bool,
    ) -> ServiceState {
        let mut rx = self.tx.subscribe();
        match rx.wait_for(|s| accept(*s)).await {
            Ok(state) => *state,
            Err(_) => self.get(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ServiceState::*;

    #[test]
    fn happy_path_transitions() {
        let cell = StateCell::default();
        assert_eq!(cell.get(), New);
        for next in [Starting, Running, Stopping, Terminated] {
            cell.transition(next).unwrap();
        }
        assert_eq!(cell.get(), Terminated);
    }

    #[test]
    fn stop_during_startup_is_allowed() {
        let cell = StateCell::default();
        cell.transition(Starting).unwrap();
        assert_eq!(cell.transition(Stopping).unwrap(), Starting);
    }

    #[test]
    fn illegal_transitions_are_rejected() {
        let cell = StateCell::default();
        let err = cell.transition(Running).unwrap_err();
        match err {
            FailureError::IllegalTransition { from, to } => {
                assert_eq!(from, New);
                assert_eq!(to, Running);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(cell.get(), New);
    }

    #[test]
    fn failed_is_absorbing() {
        let cell = StateCell::default();
        cell.transition(Starting).unwrap();
        cell.transition(Failed).unwrap();
        for next in [New, Starting, Running, Stopping, Terminated, Failed] {
            assert!(cell.transition(next).is_err());
        }
        assert!(!Terminated.can_transition_to(Failed));
    }

    #[tokio::test]
    async fn wait_until_observes_later_transition() {
        let cell = std::sync::Arc::new(StateCell::default());
        let waiter = {
            let cell = cell.clone();
            tokio::spawn(async move { cell.wait_until(|s| s == Running).await })
        };
        cell.transition(Starting).unwrap();
        cell.transition(Running).unwrap();
        assert_eq!(waiter.await.unwrap(), Running);
    }
}
