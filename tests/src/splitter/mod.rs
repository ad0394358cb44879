#[cfg(test)]
mod causal_reads_timeout_test;
#[cfg(test)]
mod transaction_replay_test;
