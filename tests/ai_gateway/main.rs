mod credentials;
mod gateway;
mod router;
