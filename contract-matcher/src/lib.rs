//! Contract matching and value resolution.
//!
//! Resolves contract values for the client or server side of an exchange
//! and matches observed messages against contracts.
//!
//! - [`value`] resolves literals, matchers, optional and dual values
//! - [`engine`] matches JSON bodies, XML bodies and named entries
//! - [`graphql`] layers GraphQL envelope checks over the JSON engine
//! - [`stub`] matches whole requests and responses and selects stubs
//! - [`assertion`] plans the checks a generated test performs

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod assertion;
pub mod command;
pub mod config;
pub mod contract;
pub mod engine;
pub mod envelope;
pub mod error;
pub mod graphql;
pub mod path;
pub mod regex_gen;
pub mod rule;
pub mod strategy;
pub mod stub;
pub mod value;
pub mod verdict;

pub use assertion::{AssertionSpec, Expectation, plan_request, plan_response};
pub use command::{CommandError, CommandRegistry, CommandTable, DeferredCommands};
pub use config::MatcherConfig;
pub use contract::{Body, BodyNode, Contract, NamedValue, Request, Response, UrlSpec};
pub use engine::MatchContext;
pub use envelope::EnvelopeMatcher;
pub use error::{ErrorKind, MatchError, ModelError};
pub use graphql::GraphQlMatcher;
pub use rule::{MatchingRule, RequestMatchers, ResponseMatchers, RuleScope};
pub use strategy::{MatchingStrategy, PredefinedPattern, RegexFlavor, TypeKind};
pub use stub::{ContractMatcher, ObservedRequest, ObservedResponse};
pub use value::{Part, Resolved, ResolvedValue, Side, Value, resolve, resolve_param_value, resolve_part};
pub use verdict::{FieldFailure, MatchVerdict};
