mod assembler;
mod facade;
mod strategy;
