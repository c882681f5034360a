pub mod jobboard_sweep;
