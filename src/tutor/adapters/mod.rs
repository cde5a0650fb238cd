pub mod ai_gateway;
