use redis::{Client, Cmd, Connection, FromRedisValue, Value};
use std::ops::Bound;

use super::{Aggregate, Direction, Expiry, Reply, ScoreStore, SetOp, StoreOp};
use crate::error::{check_score, Result};
use crate::format::{max_arg, min_arg, score_text};

/// [`ScoreStore`] backed by sorted sets and hashes on a Redis/Valkey server.
///
/// Uses one blocking connection; retries and timeouts are left to the
/// connection's own configuration. Batches go out as `MULTI`/`EXEC`.
pub struct RedisStore {
    con: Connection,
}

impl RedisStore {
    pub fn new(con: Connection) -> Self {
        Self { con }
    }

    /// Connects to a `redis://` URL.
    pub fn open(url: &str) -> Result<Self> {
        let con = Client::open(url)?.get_connection()?;
        Ok(Self::new(con))
    }

    pub fn connection(&mut self) -> &mut Connection {
        &mut self.con
    }

    pub fn into_inner(self) -> Connection {
        self.con
    }
}

fn range_cmd(key: &str, start: usize, stop: usize, direction: Direction) -> Cmd {
    let name = match direction {
        Direction::Ascending => "ZRANGE",
        Direction::Descending => "ZREVRANGE",
    };
    let mut cmd = redis::cmd(name);
    cmd.arg(key).arg(start).arg(stop).arg("WITHSCORES");
    cmd
}

fn score_range_cmd(key: &str, min: Bound<f64>, max: Bound<f64>, direction: Direction) -> Cmd {
    let mut cmd;
    match direction {
        Direction::Ascending => {
            cmd = redis::cmd("ZRANGEBYSCORE");
            cmd.arg(key).arg(min_arg(min)).arg(max_arg(max));
        }
        Direction::Descending => {
            cmd = redis::cmd("ZREVRANGEBYSCORE");
            cmd.arg(key).arg(max_arg(max)).arg(min_arg(min));
        }
    }
    cmd.arg("WITHSCORES");
    cmd
}

fn op_cmd(op: &StoreOp) -> Cmd {
    match op {
        StoreOp::Upsert { key, member, score } => {
            let mut cmd = redis::cmd("ZADD");
            cmd.arg(key).arg(score_text(*score)).arg(member);
            cmd
        }
        StoreOp::Remove { key, member } => {
            let mut cmd = redis::cmd("ZREM");
            cmd.arg(key).arg(member);
            cmd
        }
        StoreOp::Score { key, member } => {
            let mut cmd = redis::cmd("ZSCORE");
            cmd.arg(key).arg(member);
            cmd
        }
        StoreOp::Rank { key, member, direction } => {
            let name = match direction {
                Direction::Ascending => "ZRANK",
                Direction::Descending => "ZREVRANK",
            };
            let mut cmd = redis::cmd(name);
            cmd.arg(key).arg(member);
            cmd
        }
        StoreOp::Count { key } => {
            let mut cmd = redis::cmd("ZCARD");
            cmd.arg(key);
            cmd
        }
        StoreOp::CountInScoreRange { key, min, max } => {
            let mut cmd = redis::cmd("ZCOUNT");
            cmd.arg(key).arg(min_arg(*min)).arg(max_arg(*max));
            cmd
        }
        StoreOp::RemoveByScoreRange { key, min, max } => {
            let mut cmd = redis::cmd("ZREMRANGEBYSCORE");
            cmd.arg(key).arg(min_arg(*min)).arg(max_arg(*max));
            cmd
        }
        StoreOp::RemoveByRankRange { key, start, stop } => {
            let mut cmd = redis::cmd("ZREMRANGEBYRANK");
            cmd.arg(key).arg(*start).arg(*stop);
            cmd
        }
        StoreOp::SetField { key, field, value } => {
            let mut cmd = redis::cmd("HSET");
            cmd.arg(key).arg(field).arg(value);
            cmd
        }
        StoreOp::GetField { key, field } => {
            let mut cmd = redis::cmd("HGET");
            cmd.arg(key).arg(field);
            cmd
        }
        StoreOp::RemoveField { key, field } => {
            let mut cmd = redis::cmd("HDEL");
            cmd.arg(key).arg(field);
            cmd
        }
        StoreOp::Expire { key, expiry } => {
            let mut cmd;
            match expiry {
                Expiry::In(ttl) => {
                    cmd = redis::cmd("EXPIRE");
                    cmd.arg(key).arg(ttl.as_secs());
                }
                Expiry::At(ts) => {
                    cmd = redis::cmd("EXPIREAT");
                    cmd.arg(key).arg(*ts);
                }
            }
            cmd
        }
        StoreOp::Delete { key } => {
            let mut cmd = redis::cmd("DEL");
            cmd.arg(key);
            cmd
        }
    }
}

fn reply_for(op: &StoreOp, value: &Value) -> Result<Reply> {
    let reply = match op {
        StoreOp::Score { .. } => Reply::Score(Option::<f64>::from_redis_value(value)?),
        StoreOp::Rank { .. } => Reply::Rank(Option::<usize>::from_redis_value(value)?),
        StoreOp::GetField { .. } => Reply::Field(Option::<String>::from_redis_value(value)?),
        _ => Reply::Count(usize::from_redis_value(value)?),
    };
    Ok(reply)
}

impl ScoreStore for RedisStore {
    fn upsert(&mut self, key: &str, member: &str, score: f64) -> Result<bool> {
        let score = check_score(score)?;
        let added: usize = redis::cmd("ZADD")
            .arg(key)
            .arg(score_text(score))
            .arg(member)
            .query(&mut self.con)?;
        Ok(added == 1)
    }

    fn remove(&mut self, key: &str, member: &str) -> Result<bool> {
        let removed: usize = redis::cmd("ZREM").arg(key).arg(member).query(&mut self.con)?;
        Ok(removed == 1)
    }

    fn score_of(&mut self, key: &str, member: &str) -> Result<Option<f64>> {
        Ok(redis::cmd("ZSCORE").arg(key).arg(member).query(&mut self.con)?)
    }

    fn rank_of(&mut self, key: &str, member: &str, direction: Direction) -> Result<Option<usize>> {
        let op = StoreOp::Rank { key: key.to_owned(), member: member.to_owned(), direction };
        Ok(op_cmd(&op).query(&mut self.con)?)
    }

    fn count(&mut self, key: &str) -> Result<usize> {
        Ok(redis::cmd("ZCARD").arg(key).query(&mut self.con)?)
    }

    fn count_in_score_range(&mut self, key: &str, min: Bound<f64>, max: Bound<f64>) -> Result<usize> {
        Ok(redis::cmd("ZCOUNT")
            .arg(key)
            .arg(min_arg(min))
            .arg(max_arg(max))
            .query(&mut self.con)?)
    }

    fn range_by_position(
        &mut self,
        key: &str,
        start: usize,
        stop: usize,
        direction: Direction,
    ) -> Result<Vec<(String, f64)>> {
        if start > stop {
            return Ok(Vec::new());
        }
        Ok(range_cmd(key, start, stop, direction).query(&mut self.con)?)
    }

    fn range_by_score(
        &mut self,
        key: &str,
        min: Bound<f64>,
        max: Bound<f64>,
        direction: Direction,
    ) -> Result<Vec<(String, f64)>> {
        Ok(score_range_cmd(key, min, max, direction).query(&mut self.con)?)
    }

    fn remove_by_score_range(&mut self, key: &str, min: Bound<f64>, max: Bound<f64>) -> Result<usize> {
        Ok(redis::cmd("ZREMRANGEBYSCORE")
            .arg(key)
            .arg(min_arg(min))
            .arg(max_arg(max))
            .query(&mut self.con)?)
    }

    fn remove_by_rank_range(&mut self, key: &str, start: usize, stop: usize) -> Result<usize> {
        Ok(redis::cmd("ZREMRANGEBYRANK")
            .arg(key)
            .arg(start)
            .arg(stop)
            .query(&mut self.con)?)
    }

    fn combine_into(
        &mut self,
        dest: &str,
        sources: &[&str],
        op: SetOp,
        aggregate: Aggregate,
    ) -> Result<usize> {
        let name = match op {
            SetOp::Union => "ZUNIONSTORE",
            SetOp::Intersect => "ZINTERSTORE",
        };
        Ok(redis::cmd(name)
            .arg(dest)
            .arg(sources.len())
            .arg(sources)
            .arg("AGGREGATE")
            .arg(aggregate.as_arg())
            .query(&mut self.con)?)
    }

    fn batch(&mut self, ops: &[StoreOp]) -> Result<Vec<Reply>> {
        for op in ops {
            if let StoreOp::Upsert { score, .. } = op {
                check_score(*score)?;
            }
        }
        if ops.is_empty() {
            return Ok(Vec::new());
        }
        let mut pipe = redis::pipe();
        pipe.atomic();
        for op in ops {
            pipe.add_command(op_cmd(op));
        }
        let values: Vec<Value> = pipe.query(&mut self.con)?;
        ops.iter()
            .zip(values.iter())
            .map(|(op, value)| reply_for(op, value))
            .collect()
    }
}
