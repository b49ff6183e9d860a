//! Export core: pure job state machine, name normalization and reference rewriting.
mod job;
mod names;
mod references;

pub use job::{ExportJob, JobError, JobState, PollOutcome, TaskId, TaskSnapshot, TaskStatus};
pub use names::{
    strip_dir_suffix, strip_hash_suffix, NameError, EXPORT_ROOT_NAME, HASH_SUFFIX_LEN,
};
pub use references::{is_markdown_name, rewrite_reference_text, RewrittenText};
