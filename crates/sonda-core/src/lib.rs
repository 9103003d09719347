pub mod answer;
pub mod catalog;
pub mod cnpj;
pub mod record;

pub use answer::{Answer, AnswerValue};
pub use catalog::{Catalog, Priority, Question, QuestionKind, Section};
pub use cnpj::{Cnpj, CnpjError};
pub use record::{Activity, Address, AnswerRecord, CompanyRecord, SessionRecord, Shareholder};
