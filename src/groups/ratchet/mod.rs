pub mod sender_chain_key;
pub mod sender_message_key;

use crate::error::ProtocolError;
use crate::state::sender_key_state::SenderKeyState;
use sender_message_key::SenderMessageKey;

const MAX_FUTURE_MESSAGES: u32 = 2000;

/// Advances the state's chain to `iteration` and returns that message
/// key. Iterations behind the chain must come from the skipped-key
/// cache; the keys for intermediate iterations are cached on the way
/// forward.
pub fn get_sender_key(
    state: &mut SenderKeyState,
    iteration: u32,
) -> Result<SenderMessageKey, ProtocolError> {
    let mut chain_key = state.sender_chain_key().clone();

    if chain_key.iteration() > iteration {
        let current = chain_key.iteration();
        return state
            .take_sender_message_key(iteration)
            .ok_or(ProtocolError::DuplicateOrUnknownMessage {
                current,
                received: iteration,
            });
    }

    if iteration - chain_key.iteration() > MAX_FUTURE_MESSAGES {
        return Err(ProtocolError::TooFarInFuture);
    }

    while chain_key.iteration() < iteration {
        state.add_sender_message_key(chain_key.sender_message_key());
        chain_key = chain_key.next();
    }

    let message_key = chain_key.sender_message_key();
    state.set_sender_chain_key(chain_key.next());
    Ok(message_key)
}
