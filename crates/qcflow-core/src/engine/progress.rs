/// Events emitted while a flow executes.
#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    FlowStart { name: String, total_jobs: usize },
    FlowFinish { executed: usize, skipped: usize },

    JobStart { name: String, position: usize },
    JobFinish { name: String },
    /// The job's guard failed; its output is the output of `fallback`.
    JobSkipped { name: String, fallback: String },
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

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
