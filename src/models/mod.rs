mod participant;
mod survey;

pub use participant::Participant;
pub use survey::Survey;
