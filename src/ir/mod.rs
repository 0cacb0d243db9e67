//! Three-address intermediate representation and the AST → IR lowering pass
//! (§3, §4.3).

pub mod abi;
pub mod func;
pub mod gen;
pub mod inst;
pub mod module;
pub mod operand;

pub use func::IrFunction;
pub use gen::IrGen;
pub use module::IrModule;
