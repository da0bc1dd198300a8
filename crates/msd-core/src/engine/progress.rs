/// Events fired while a run advances.
#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    RunStart { total_steps: u64, batch_size: u64 },
    BatchFinish { completed_steps: u64 },
    RunFinish { completed_steps: u64, cancelled: bool },
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + 'a>;

#[derive(Default)]
pub struct ProgressReporter<'a> {
    callback: Option<ProgressCallback<'a>>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: ProgressCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    #[inline]
    pub fn report(&self, event: Progress) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn reporter_without_callback_is_silent() {
        ProgressReporter::new().report(Progress::BatchFinish { completed_steps: 1 });
    }

    #[test]
    fn reporter_forwards_events() {
        let events = RefCell::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|e| events.borrow_mut().push(e)));
        reporter.report(Progress::RunStart {
            total_steps: 10,
            batch_size: 5,
        });
        reporter.report(Progress::RunFinish {
            completed_steps: 10,
            cancelled: false,
        });
        drop(reporter);
        assert_eq!(events.into_inner().len(), 2);
    }
}
