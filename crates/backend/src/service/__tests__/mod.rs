mod chat_flow;
mod helpers;
