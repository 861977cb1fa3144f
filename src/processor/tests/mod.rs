use super::test_helpers::{
    Gate, Reply, ScriptedGenerator, batch_request, create_test_processor, test_config,
    wait_for_batch,
};
use super::*;
use crate::error::{BatchError, Error};
use crate::types::{BatchId, BatchStatus, ItemStatus};
use std::time::Duration;
