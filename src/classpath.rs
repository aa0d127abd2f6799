//! Initial and deferred classpath computation for secondary tasks.
use crate::core::Classpath;
use crate::task::{PrimaryTask, SecondaryTask};

/// Values resolved right before a secondary task executes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finalized {
    pub classpath: Classpath,
    pub annotation_processor_path: Classpath,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ClasspathResolver;

impl ClasspathResolver {
    /// Copy of the primary classpath as seen while the graph is configured.
    pub fn initial_classpath(&self, primary: &PrimaryTask) -> Classpath {
        primary.classpath.clone()
    }

    /// Boot entries first, then the primary classpath as it is now, then any
    /// entry of `initial` that has since disappeared. The result never loses an
    /// entry the task was configured with.
    pub fn finalized_classpath(
        &self,
        variant: &str,
        primary: &PrimaryTask,
        boot_classpath: &Classpath,
        initial: &Classpath,
    ) -> Finalized {
        let classpath = boot_classpath.union(&primary.classpath).union(initial);

        tracing::debug!(
            variant,
            "finalized classpath with {} boot entries: {}",
            boot_classpath.len(),
            classpath
        );

        Finalized {
            classpath,
            annotation_processor_path: primary.annotation_processor_path.clone(),
        }
    }

    /// Resolves and stores the finalized values on `task`.
    pub fn finalize(&self, task: &mut SecondaryTask, primary: &PrimaryTask, boot_classpath: &Classpath) {
        let finalized =
            self.finalized_classpath(&task.variant, primary, boot_classpath, task.classpath.initial());

        task.classpath.finalize(finalized.classpath);
        task.annotation_processor_path = Some(finalized.annotation_processor_path);
    }
}
