//! Macro functions used in the `Client` datagram handler.

/// Logs an outgoing message, with the full table at `debug`.
macro_rules! log_send(
    ($message:expr, $destination:expr) => (
        info!("Sending {} to {}", $message.message_type, $destination);
        debug!("{}", $message);
    );
);

/// Logs an incoming message, with the full table at `debug`.
macro_rules! log_receive(
    ($message:expr, $source:expr) => (
        info!("Received {} from {}", $message.message_type, $source);
        debug!("{}", $message);
    );
);

/// Decodes and validates a datagram or returns from the handler.
macro_rules! decode (
    ($datagram:expr) => (
        match LeaseMessage::from_bytes($datagram.payload).and_then(|message| message.validate().map(|_| message)) {
            Ok(message) => message,
            Err(error) => {
                debug!("Dropped a datagram from {}: {}", $datagram.source, error);
                return;
            },
        }
    );
);

/// Returns from the handler if the transaction ID is not ours.
macro_rules! check_xid (
    ($yours:expr, $response:expr) => (
        if $response != $yours {
            debug!("Got a response with wrong transaction ID: {:#010x} (yours is {:#010x})", $response, $yours);
            return;
        }
    );
);
