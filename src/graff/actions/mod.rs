// SPDX-License-Identifier: MIT

//! Ready-made block actions

pub mod fanout;
pub mod input;
pub mod llm;
pub mod print;
pub mod scaff_node;
pub mod split;

pub use fanout::FanOut;
pub use input::Input;
pub use llm::Llm;
pub use print::Print;
pub use scaff_node::ScaffNode;
pub use split::Split;
