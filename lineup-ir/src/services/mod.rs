//! Services for the identity resolution engine
//!
//! External collaborators (describer, grouping classifier, visual
//! comparator) are consumed through capability traits so the decision
//! logic is unit-testable without networking; the HTTP implementations
//! live alongside their traits.

pub mod classifier;
pub mod comparator;
pub mod describer;
pub mod resolver;
pub mod shortlister;
pub mod verifier;

pub use classifier::{ClassificationSubject, ClassifierError, GroupingClassifier, RawGroupScore};
pub use comparator::{ComparatorError, VisualComparator, VisualComparison};
pub use describer::{Describer, DescriberError, Description};
pub use resolver::{ResolutionOrchestrator, ResolveError};
pub use shortlister::CandidateShortlister;
pub use verifier::{VerifierError, VisionVerifier};
