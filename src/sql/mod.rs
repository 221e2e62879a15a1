pub mod ast;
pub mod functions;
pub mod lexer;
pub mod parser;
