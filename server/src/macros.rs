//! Macro functions used in the `Server` datagram handler.

/// Logs an incoming message, with the full table at `debug`.
macro_rules! log_receive(
    ($message:expr, $source:expr) => (
        info!("Received {} from {}", $message.message_type, $source);
        debug!("{}", $message);
    );
);

/// Logs an outgoing message, with the full table at `debug`.
macro_rules! log_send(
    ($message:expr, $destination:expr) => (
        info!("Sending {} to {}", $message.message_type, $destination);
        debug!("{}", $message);
    );
);

/// Decodes and validates a datagram or returns from the handler.
macro_rules! decode (
    ($datagram:expr) => (
        match LeaseMessage::from_bytes($datagram.payload).and_then(|message| message.validate().map(|_| message)) {
            Ok(message) => message,
            Err(error) => {
                debug!("The request from {} is invalid: {}", $datagram.source, error);
                return;
            },
        }
    );
);
