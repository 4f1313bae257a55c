mod node;
mod relationship;
mod scalar_field;

pub(crate) use self::{node::*, relationship::*, scalar_field::*};
