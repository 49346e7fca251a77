// SPDX-License-Identifier: Apache-2.0
mod case;
mod driver;
mod report;

pub use case::{read_cases, EvalCase};
pub use driver::{Evaluator, EvaluatorConfig};
pub use report::{EvalCaseResult, EvalReport, EvalSummary};
